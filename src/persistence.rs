//! # Weight Snapshots
//!
//! Private little-endian binary layout of a [`ValueNetwork`]:
//!
//! 1. `input_size, hidden_size, output_size` as three `i32`
//! 2. `W_in` row-major, `input_size` rows of `hidden_size` floats
//! 3. for each hidden unit `i`: `b1[i]`, `b2[i]`, row `W_h1[i][..]`
//!    (`hidden_size` floats), row `W_h2[i][..]` (`output_size` floats)
//! 4. the output bias, `output_size` floats
//!
//! The three sizes are the only versioning; a snapshot from a differently
//! sized network is rejected on load instead of being coerced.

use log::{info, warn};
use serde::{Serialize, Deserialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::NetworkConfig;
use crate::error::{DashError, Result};
use crate::network::ValueNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotHeader {
    input_size: i32,
    hidden_size: i32,
    output_size: i32,
}

impl SnapshotHeader {
    fn for_config(config: NetworkConfig) -> Result<Self> {
        let to_i32 = |name: &str, size: usize| {
            i32::try_from(size).map_err(|_| {
                DashError::invalid_parameter(name.to_string(), format!("{} does not fit in an i32", size))
            })
        };
        Ok(SnapshotHeader {
            input_size: to_i32("input_size", config.input_size)?,
            hidden_size: to_i32("hidden_size", config.hidden_size)?,
            output_size: to_i32("output_size", config.output_size)?,
        })
    }
}

impl std::fmt::Display for SnapshotHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.input_size, self.hidden_size, self.output_size)
    }
}

/// Encode `network` into `writer` in snapshot layout.
pub fn write_network<W: Write>(network: &ValueNetwork, mut writer: W) -> Result<()> {
    let header = SnapshotHeader::for_config(network.config())?;
    bincode::serialize_into(&mut writer, &header)?;

    for &w in network.hidden1.weights.iter() {
        write_f32(&mut writer, w)?;
    }

    let hidden_rows = network.hidden2.weights.rows().into_iter();
    let output_rows = network.output.weights.rows().into_iter();
    for (i, (h1_row, h2_row)) in hidden_rows.zip(output_rows).enumerate() {
        write_f32(&mut writer, network.hidden1.biases[i])?;
        write_f32(&mut writer, network.hidden2.biases[i])?;
        for &w in h1_row.iter() {
            write_f32(&mut writer, w)?;
        }
        for &w in h2_row.iter() {
            write_f32(&mut writer, w)?;
        }
    }

    for &b in network.output.biases.iter() {
        write_f32(&mut writer, b)?;
    }

    writer.flush()?;
    Ok(())
}

/// Decode a snapshot from `reader` into `network`.
///
/// The header must match the network's configured sizes, otherwise
/// `ConfigMismatch` is returned. Parameters are decoded into a staging copy
/// and only committed once the whole payload was read, so on any error the
/// network is left untouched.
pub fn read_network_into<R: Read>(network: &mut ValueNetwork, mut reader: R) -> Result<()> {
    let expected = SnapshotHeader::for_config(network.config())?;
    let found: SnapshotHeader = bincode::deserialize_from(&mut reader)?;
    if found != expected {
        return Err(DashError::config_mismatch(expected.to_string(), found.to_string()));
    }

    let mut staged = network.clone();

    for w in staged.hidden1.weights.iter_mut() {
        *w = read_f32(&mut reader)?;
    }

    let hidden_size = staged.config().hidden_size;
    for i in 0..hidden_size {
        staged.hidden1.biases[i] = read_f32(&mut reader)?;
        staged.hidden2.biases[i] = read_f32(&mut reader)?;
        for w in staged.hidden2.weights.row_mut(i).iter_mut() {
            *w = read_f32(&mut reader)?;
        }
        for w in staged.output.weights.row_mut(i).iter_mut() {
            *w = read_f32(&mut reader)?;
        }
    }

    for b in staged.output.biases.iter_mut() {
        *b = read_f32(&mut reader)?;
    }

    *network = staged;
    Ok(())
}

/// Write a snapshot of `network` to `path`, replacing any existing file.
///
/// The snapshot is written to a sibling `.tmp` file and renamed over `path`
/// once complete, so a failed save leaves the previous snapshot intact.
pub fn save_network<P: AsRef<Path>>(network: &ValueNetwork, path: P) -> Result<()> {
    let path = path.as_ref();
    let staging = staging_path(path);
    if let Err(e) = write_file(network, &staging) {
        if staging.is_file() {
            if let Err(cleanup) = fs::remove_file(&staging) {
                warn!("Could not remove {}: {}", staging.display(), cleanup);
            }
        }
        return Err(e);
    }
    fs::rename(&staging, path)?;
    info!("Network saved to {}", path.display());
    Ok(())
}

/// `<path>.tmp`, next to `path`
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_file(network: &ValueNetwork, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_network(network, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Load a snapshot from `path` into `network`; see [`read_network_into`].
pub fn load_network_into<P: AsRef<Path>>(network: &mut ValueNetwork, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_network_into(network, BufReader::new(file))?;
    info!("Network loaded from {}", path.display());
    Ok(())
}

/// Size in bytes of a snapshot for the given architecture
pub fn snapshot_len(config: NetworkConfig) -> usize {
    let NetworkConfig { input_size, hidden_size, output_size } = config;
    let floats = input_size * hidden_size + hidden_size * (2 + hidden_size + output_size) + output_size;
    3 * 4 + floats * 4
}

fn write_f32<W: Write>(writer: &mut W, value: f32) -> Result<()> {
    bincode::serialize_into(writer, &value)?;
    Ok(())
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    Ok(bincode::deserialize_from(reader)?)
}
