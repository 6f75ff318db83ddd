use chrono::{DateTime, Utc};

/// Placeholder for cells with no data
pub const UNAVAILABLE: &str = "-";

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// How memory columns are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitMode {
    /// `G` suffix from 1 GiB up, `M` below
    #[default]
    Human,
    Mebibytes,
    Gibibytes,
    Bytes,
}

/// Format a byte quantity in the given unit mode
pub fn format_memory(bytes: i64, mode: UnitMode) -> String {
    match mode {
        UnitMode::Bytes => bytes.to_string(),
        UnitMode::Mebibytes => format!("{:.1}", bytes as f64 / MIB),
        UnitMode::Gibibytes => format!("{:.2}", bytes as f64 / GIB),
        UnitMode::Human => {
            let gib = bytes as f64 / GIB;
            if gib >= 1.0 {
                format!("{:.2}G", gib)
            } else {
                format!("{:.1}M", bytes as f64 / MIB)
            }
        }
    }
}

/// Format the age of an object created at `created`, as seen at `now`
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return UNAVAILABLE.to_string();
    };
    if created.timestamp() == 0 {
        return UNAVAILABLE.to_string();
    }

    let age = now.signed_duration_since(created);
    let hours = age.num_hours();
    if hours >= 48 {
        format!("{}d", age.num_days())
    } else if hours >= 1 {
        format!("{}h", hours)
    } else {
        format!("{}m", age.num_minutes().max(0))
    }
}
