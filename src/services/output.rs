use crate::domain::models::JsonOut;
use serde::Serialize;

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        print_json(true, data)?;
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        print_json(true, data)?;
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// `ok` is false only when a strict run is about to fail.
pub fn print_json<T: Serialize>(ok: bool, data: T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&JsonOut { ok, data })?
    );
    Ok(())
}
