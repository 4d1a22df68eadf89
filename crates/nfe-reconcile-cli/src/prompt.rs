use anyhow::Result;
use dialoguer::Input;
use nfe_reconcile::DateWindow;

/// Window from `--from`/`--to`, asking on the terminal for whichever is missing.
pub fn date_window(from: Option<String>, to: Option<String>) -> Result<DateWindow> {
    let from = match from {
        Some(from) => from,
        None => ask("Start date for the query (YYYY-MM-DD)")?,
    };
    let to = match to {
        Some(to) => to,
        None => ask("End date for the query (YYYY-MM-DD)")?,
    };
    DateWindow::parse(&from, &to)
}

fn ask(prompt: &str) -> Result<String> {
    let value = Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| {
            DateWindow::parse(input, input)
                .map(drop)
                .map_err(|error| error.to_string())
        })
        .interact_text()?;
    Ok(value)
}
