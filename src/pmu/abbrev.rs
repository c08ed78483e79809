//! Abbreviations that shorten event names on the sampling command line.
//!
//! Uncore events are repeated once per device, so their names dominate the command length.

/// Ordered `(long, short)` substring replacements.
///
/// Longer forms come before the forms they contain. Any replacement of an `UNC` name must start
/// with `UNC` too, uncore events are recognized by that prefix.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("UNC_CHA_TOR_INSERTS", "UNCCTI"),
    ("UNC_CHA_TOR_OCCUPANCY", "UNCCTO"),
    ("UNC_CHA_CLOCKTICKS", "UNCCCT"),
    ("UNC_M_CAS_COUNT_SCH", "UNCMCC"),
    ("IA_MISS_DRD_REMOTE", "IMDR"),
    ("IA_MISS_DRD_LOCAL", "IMDL"),
    ("IA_MISS_LLCPREFDATA", "IMLP"),
    ("IA_MISS_LLCPREFRFO", "IMLR"),
    ("IA_MISS_DRD_PREF_LOCAL", "IMDPL"),
    ("IA_MISS_DRD_PREF_REMOTE", "IMDRP"),
    ("IA_MISS_CRD_PREF", "IMCP"),
    ("IA_MISS_RFO_PREF", "IMRP"),
    ("IA_MISS_RFO", "IMRF"),
    ("IA_MISS_CRD", "IMC"),
    ("IA_MISS_DRD", "IMD"),
    ("IO_PCIRDCUR", "IPCI"),
    ("IO_ITOMCACHENEAR", "IITN"),
    ("IO_ITOM", "IITO"),
    ("IMD_OPT", "IMDO"),
];

/// Replace every long form found in `event` with its abbreviation.
pub fn abbreviate(event: &str) -> String {
    ABBREVIATIONS
        .iter()
        .fold(String::from(event), |acc, (long, short)| acc.replace(long, short))
}
