use super::IntegerProgram;
use crate::error::Result;
use crate::instance::AuctionInstance;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `model_<timestamp>`, used when the caller gives no model name
pub fn default_model_name() -> String {
    format!("model_{}", chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Write the integer program of `instance` in CPLEX LP format.
pub fn write_lp(instance: &AuctionInstance, buffer: &mut impl Write) -> Result<()> {
    let program = IntegerProgram::from_instance(instance);

    writeln!(buffer, "\\* {} *\\", program.name)?;
    writeln!(buffer, "Maximize")?;
    write!(buffer, "OBJ:")?;
    if program.objective.is_empty() {
        write!(buffer, " 0 {}", IntegerProgram::var_name(0))?;
    }
    for (i, price) in program.objective.iter().enumerate() {
        write!(buffer, " + {} {}", price, IntegerProgram::var_name(i))?;
    }
    writeln!(buffer)?;

    writeln!(buffer, "Subject To")?;
    for row in &program.rows {
        write!(buffer, "{}:", row.name)?;
        for &i in &row.bids {
            write!(buffer, " + {}", IntegerProgram::var_name(i))?;
        }
        writeln!(buffer, " <= 1")?;
    }

    // binaries carry their own 0..1 bounds
    writeln!(buffer, "Binaries")?;
    for i in 0..program.num_vars() {
        writeln!(buffer, "{}", IntegerProgram::var_name(i))?;
    }
    writeln!(buffer, "End")?;
    Ok(())
}

/// Write the integer program of `instance` in fixed-section MPS format.
///
/// MPS has no objective sense, so the prices are negated and the model minimized.
pub fn write_mps(instance: &AuctionInstance, buffer: &mut impl Write) -> Result<()> {
    let program = IntegerProgram::from_instance(instance);

    writeln!(buffer, "NAME {}", program.name)?;
    writeln!(buffer, "ROWS")?;
    writeln!(buffer, " N    OBJ")?;
    for row in &program.rows {
        writeln!(buffer, " L    {}", row.name)?;
    }

    // column-major: every row a bid appears in, grouped under the bid
    let mut rows_of_bid = vec![Vec::new(); program.num_vars()];
    for row in &program.rows {
        for &bid in &row.bids {
            rows_of_bid[bid].push(row.name.as_str());
        }
    }

    writeln!(buffer, "COLUMNS")?;
    writeln!(buffer, "    MARKER    'MARKER'    'INTORG'")?;
    for (i, price) in program.objective.iter().enumerate() {
        let var = IntegerProgram::var_name(i);
        writeln!(buffer, "    {}    OBJ    {}", var, -price)?;
        for row in &rows_of_bid[i] {
            writeln!(buffer, "    {}    {}    1", var, row)?;
        }
    }
    writeln!(buffer, "    MARKER    'MARKER'    'INTEND'")?;

    writeln!(buffer, "RHS")?;
    for row in &program.rows {
        writeln!(buffer, "    RHS    {}    1", row.name)?;
    }

    writeln!(buffer, "BOUNDS")?;
    for i in 0..program.num_vars() {
        writeln!(buffer, " BV BND    {}", IntegerProgram::var_name(i))?;
    }
    writeln!(buffer, "ENDATA")?;
    Ok(())
}

/// Write `<dir>/<model_name>.mps`, creating `dir` if needed
pub fn write_mps_file(
    instance: &AuctionInstance,
    dir: &Path,
    model_name: Option<&str>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = model_name.map_or_else(default_model_name, str::to_string);
    let path = dir.join(format!("{}.mps", name));

    let mut writer = BufWriter::new(File::create(&path)?);
    write_mps(instance, &mut writer)?;
    writer.flush()?;
    Ok(path)
}

/// Write `<dir>/<model_name>.lp`, creating `dir` if needed
pub fn write_lp_file(
    instance: &AuctionInstance,
    dir: &Path,
    model_name: Option<&str>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = model_name.map_or_else(default_model_name, str::to_string);
    let path = dir.join(format!("{}.lp", name));

    log::info!("Saving the model as {}", name);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_lp(instance, &mut writer)?;
    writer.flush()?;
    Ok(path)
}
