//! Custom assertions for E2E tests

use onionsweep_process::process_exists;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments the fake measurement binary recorded in its output file.
pub fn recorded_args(output: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(output)
        .map_err(|e| format!("No output at {}: {}", output.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Output at {} is not JSON: {}", output.display(), e))?;
    value["args"]
        .as_array()
        .ok_or_else(|| format!("Output at {} has no args: {}", output.display(), content))?
        .iter()
        .map(|arg| {
            arg.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Non-string argument in {}", output.display()))
        })
        .collect()
}

/// Value following `flag` in a recorded argument list, every occurrence.
pub fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

/// Assert that the benchmark ran with `flag value`
pub fn assert_flag(args: &[String], flag: &str, expected: &str) -> Result<(), String> {
    let values = flag_values(args, flag);
    if values == [expected] {
        Ok(())
    } else {
        Err(format!(
            "Expected {} {} once, found {:?}. Args: {:?}",
            flag, expected, values, args
        ))
    }
}

/// Number of runs the fake recorded in its state file (one byte each).
pub fn run_count(state_file: &Path) -> u64 {
    fs::metadata(state_file).map(|m| m.len()).unwrap_or(0)
}

/// Check that every daemon the fake recorded under `pid_dir` is gone along
/// with its data directory. Returns how many daemons were recorded.
pub fn assert_daemons_torn_down(pid_dir: &Path) -> Result<usize, String> {
    let entries = fs::read_dir(pid_dir)
        .map_err(|e| format!("Cannot read {}: {}", pid_dir.display(), e))?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let pid: u32 = entry
            .file_name()
            .to_string_lossy()
            .parse()
            .map_err(|e| format!("Bad pid record {:?}: {}", entry.file_name(), e))?;
        let data_dir = PathBuf::from(fs::read_to_string(entry.path()).map_err(|e| e.to_string())?);

        if process_exists(pid).map_err(|e| e.to_string())? {
            return Err(format!("Daemon {} is still running", pid));
        }
        if data_dir.exists() {
            return Err(format!("Data directory {} was left behind", data_dir.display()));
        }
        count += 1;
    }
    Ok(count)
}
