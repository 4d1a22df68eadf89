use crate::NormalizedRecord;
use std::collections::BTreeSet;

/// Invoice numbers present on the POS side but not on the ERP side, ascending.
///
/// Keys are fixed-width strings, so the lexical order of the set is also the
/// numeric order. Duplicates on either side count once.
pub fn missing_invoice_numbers(
    pos: &[NormalizedRecord],
    erp: &[NormalizedRecord],
) -> BTreeSet<String> {
    let erp_keys: BTreeSet<&str> = erp
        .iter()
        .map(|record| record.invoice_number.as_str())
        .collect();

    pos.iter()
        .map(|record| record.invoice_number.as_str())
        .filter(|key| !erp_keys.contains(key))
        .map(ToOwned::to_owned)
        .collect()
}
