//! Column encodings shared by the repositories.

use std::str::FromStr;

use chrono::TimeDelta;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use hvac_domain::device::Device;
use hvac_domain::mode::SystemMode;
use hvac_domain::pin::GpioPin;

pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn mode(value: &str) -> Result<SystemMode, sqlx::Error> {
    SystemMode::from_str(value).map_err(decode_error)
}

/// Modes are stored as a JSON array of their lowercase names.
pub(crate) fn modes(value: &str) -> Result<Vec<SystemMode>, sqlx::Error> {
    serde_json::from_str(value).map_err(decode_error)
}

pub(crate) fn encode_modes(modes: &[SystemMode]) -> Result<String, serde_json::Error> {
    serde_json::to_string(modes)
}

fn pin_number(value: i64) -> Result<u8, sqlx::Error> {
    u8::try_from(value).map_err(decode_error)
}

/// Read a pin stored as `<prefix>_number` / `<prefix>_active_high`.
pub(crate) fn pin(row: &SqliteRow, prefix: &str) -> Result<GpioPin, sqlx::Error> {
    let number: i64 = row.try_get(format!("{prefix}_number").as_str())?;
    let active_high: bool = row.try_get(format!("{prefix}_active_high").as_str())?;
    Ok(GpioPin::new(pin_number(number)?, active_high))
}

/// Like [`pin`], for columns that only some device kinds fill.
pub(crate) fn optional_pin(row: &SqliteRow, prefix: &str) -> Result<Option<GpioPin>, sqlx::Error> {
    let number: Option<i64> = row.try_get(format!("{prefix}_number").as_str())?;
    let active_high: Option<bool> = row.try_get(format!("{prefix}_active_high").as_str())?;
    match (number, active_high) {
        (Some(number), Some(active_high)) => Ok(Some(GpioPin::new(pin_number(number)?, active_high))),
        _ => Ok(None),
    }
}

/// The core columns every device row carries.
pub(crate) fn device(row: &SqliteRow) -> Result<Device, sqlx::Error> {
    let active_modes: String = row.try_get("active_modes")?;
    Ok(Device {
        name: row.try_get("name")?,
        pin: pin(row, "pin")?,
        min_on: TimeDelta::seconds(row.try_get("min_on_secs")?),
        min_off: TimeDelta::seconds(row.try_get("min_off_secs")?),
        online: row.try_get("online")?,
        last_changed: row.try_get("last_changed")?,
        active_modes: modes(&active_modes)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_store_modes_by_lowercase_name() {
        let encoded = encode_modes(&[SystemMode::Heating, SystemMode::Circulate]).unwrap();
        assert_eq!(encoded, r#"["heating","circulate"]"#);
        assert_eq!(
            modes(&encoded).unwrap(),
            vec![SystemMode::Heating, SystemMode::Circulate]
        );
    }

    #[test]
    fn should_reject_unknown_mode_name() {
        assert!(mode("defrost").is_err());
    }
}
