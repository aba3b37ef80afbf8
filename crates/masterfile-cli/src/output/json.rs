use masterfile_core::error::MasterfileError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), MasterfileError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
