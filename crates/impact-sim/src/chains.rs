//! Plain-text chain files, one row per outer iteration.
//!
//! - `noisechain.dat`: `dlogL` then, per channel, the relative errors
//!   `(injected − sampled)/injected` of the inertial, thruster and angular
//!   amplitudes of the cold chain.
//! - `impactchain.dat`: one row per cold-chain impact:
//!   `iteration dlogL N t0 P map0 map1 cosθ φ face x y z`.
//!
//! Resuming from a checkpoint at iteration `k` cuts every file back to the
//! rows of iterations `0..k` before appending, so the kernel's replay of
//! iteration `k` onwards does not duplicate rows.
//! - `logLchain.dat`: cold-chain `N`, then `dlogL` by rank, then the
//!   temperatures by rank.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use impact_core::{ImpactError, NoiseComponent, NoiseParameters};
use impact_mcmc::{IterationRecord, IterationSink};

pub const NOISE_CHAIN: &str = "noisechain.dat";
pub const IMPACT_CHAIN: &str = "impactchain.dat";
pub const LOGL_CHAIN: &str = "logLchain.dat";

struct ChainFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ChainFile {
    fn open(dir: &Path, name: &str, append: bool) -> Result<Self, ImpactError> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|err| ImpactError::serde_at("chain-open", err, &path))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Rewrites `path` keeping only the rows accepted by `keep`, which sees
    /// the row's line index and its text.
    fn retain_rows(
        path: &Path,
        mut keep: impl FnMut(usize, &str) -> bool,
    ) -> Result<(), ImpactError> {
        if !path.exists() {
            return Ok(());
        }
        let text = fs::read_to_string(path)
            .map_err(|err| ImpactError::serde_at("chain-truncate", err, path))?;
        let mut kept = String::with_capacity(text.len());
        for (line, row) in text.lines().enumerate() {
            if keep(line, row) {
                kept.push_str(row);
                kept.push('\n');
            }
        }
        fs::write(path, kept).map_err(|err| ImpactError::serde_at("chain-truncate", err, path))
    }

    fn write_row(&mut self, row: &str) -> Result<(), ImpactError> {
        writeln!(self.writer, "{row}")
            .map_err(|err| ImpactError::serde_at("chain-write", err, &self.path))
    }

    fn flush(&mut self) -> Result<(), ImpactError> {
        self.writer
            .flush()
            .map_err(|err| ImpactError::serde_at("chain-flush", err, &self.path))
    }
}

/// Writes the three chain files as records arrive.
pub struct ChainWriter {
    injected: NoiseParameters,
    noise: ChainFile,
    impacts: ChainFile,
    log_likelihood: ChainFile,
}

impl ChainWriter {
    /// Opens the chain files in `dir`. With `resume_from: Some(k)` the
    /// existing files are cut back to iterations `0..k` and then appended to;
    /// otherwise they start empty.
    pub fn create(
        dir: &Path,
        injected: NoiseParameters,
        resume_from: Option<usize>,
    ) -> Result<Self, ImpactError> {
        let append = resume_from.is_some();
        if let Some(iteration) = resume_from {
            ChainFile::retain_rows(&dir.join(NOISE_CHAIN), |line, _| line < iteration)?;
            ChainFile::retain_rows(&dir.join(LOGL_CHAIN), |line, _| line < iteration)?;
            ChainFile::retain_rows(&dir.join(IMPACT_CHAIN), |_, row| {
                row.split_whitespace()
                    .next()
                    .and_then(|field| field.parse::<usize>().ok())
                    .is_some_and(|recorded| recorded < iteration)
            })?;
        }
        Ok(Self {
            injected,
            noise: ChainFile::open(dir, NOISE_CHAIN, append)?,
            impacts: ChainFile::open(dir, IMPACT_CHAIN, append)?,
            log_likelihood: ChainFile::open(dir, LOGL_CHAIN, append)?,
        })
    }

    pub fn flush(&mut self) -> Result<(), ImpactError> {
        self.noise.flush()?;
        self.impacts.flush()?;
        self.log_likelihood.flush()
    }
}

impl IterationSink for ChainWriter {
    fn record(&mut self, record: &IterationRecord) -> Result<(), ImpactError> {
        let cold = &record.cold_chain;
        let dlogl = record.log_likelihoods.first().copied().unwrap_or(f64::NEG_INFINITY);

        let mut row = format!("{dlogl:.12e}");
        for (injected, sampled) in self.injected.channels.iter().zip(&cold.noise.channels) {
            for component in NoiseComponent::ALL {
                let reference = injected.get(component);
                row.push_str(&format!(
                    " {:.12e}",
                    (reference - sampled.get(component)) / reference
                ));
            }
        }
        self.noise.write_row(&row)?;

        let n = cold.events.len();
        let iteration = record.iteration;
        for event in &cold.events {
            self.impacts.write_row(&format!(
                "{iteration} {dlogl:.12e} {n} {:.12e} {:.12e} {:.12e} {:.12e} {:.12e} {:.12e} {} {:.12e} {:.12e} {:.12e}",
                event.time,
                event.momentum,
                event.map[0],
                event.map[1],
                event.cos_incidence,
                event.azimuth,
                event.face.as_raw(),
                event.point.x,
                event.point.y,
                event.point.z,
            ))?;
        }

        let mut row = n.to_string();
        for value in record.log_likelihoods.iter().chain(&record.temperatures) {
            row.push_str(&format!(" {value:.12e}"));
        }
        self.log_likelihood.write_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use impact_core::{FaceId, ImpactEvent, SurfacePoint};
    use impact_mcmc::ParameterSet;
    use impact_model::nominal_channel_noise;

    use super::*;

    fn record() -> IterationRecord {
        let injected = NoiseParameters::uniform(3, nominal_channel_noise());
        let mut noise = injected.clone();
        noise.channels[1].thruster *= 0.5;
        let surface = SurfacePoint {
            face: FaceId::from_raw(2),
            point: [0.5, 0.25, 0.0].into(),
            map: [0.3, 0.1],
        };
        IterationRecord {
            iteration: 0,
            log_likelihoods: vec![-1.5, -20.0],
            dimensions: vec![2, 0],
            temperatures: vec![1.0, 1.5],
            cold_chain: ParameterSet {
                events: vec![
                    ImpactEvent::at(surface, 10.0, 3.0, 0.5, 1.0),
                    ImpactEvent::at(surface, 20.0, 4.0, 0.5, 1.0),
                ],
                noise,
                locked_spectrum: None,
            },
            exchanges_accepted: 1,
        }
    }

    #[test]
    fn rows_follow_the_chain_layout() {
        let dir = tempfile::tempdir().unwrap();
        let injected = NoiseParameters::uniform(3, nominal_channel_noise());
        let mut writer = ChainWriter::create(dir.path(), injected, None).unwrap();
        writer.record(&record()).unwrap();
        writer.flush().unwrap();

        let noise = std::fs::read_to_string(dir.path().join(NOISE_CHAIN)).unwrap();
        let columns: Vec<f64> = noise
            .split_whitespace()
            .map(|value| value.parse().unwrap())
            .collect();
        assert_eq!(columns.len(), 1 + 3 * 3);
        assert_eq!(columns[0], -1.5);
        assert!((columns[1 + 3 + 1] - 0.5).abs() < 1e-12);
        assert_eq!(columns[1], 0.0);

        let impacts = std::fs::read_to_string(dir.path().join(IMPACT_CHAIN)).unwrap();
        let rows: Vec<&str> = impacts.lines().collect();
        assert_eq!(rows.len(), 2);
        let first: Vec<&str> = rows[0].split_whitespace().collect();
        assert_eq!(first.len(), 13);
        assert_eq!(first[0], "0");
        assert_eq!(first[2], "2");
        assert_eq!(first[9], "2");

        let logl = std::fs::read_to_string(dir.path().join(LOGL_CHAIN)).unwrap();
        let fields: Vec<&str> = logl.split_whitespace().collect();
        assert_eq!(fields.len(), 1 + 2 + 2);
        assert_eq!(fields[0], "2");
    }

    #[test]
    fn resume_cuts_rows_back_to_the_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let injected = NoiseParameters::uniform(3, nominal_channel_noise());
        let mut writer = ChainWriter::create(dir.path(), injected.clone(), None).unwrap();
        for iteration in 0..5 {
            writer.record(&IterationRecord { iteration, ..record() }).unwrap();
        }
        writer.flush().unwrap();
        drop(writer);

        let mut writer = ChainWriter::create(dir.path(), injected, Some(3)).unwrap();
        for iteration in 3..5 {
            writer.record(&IterationRecord { iteration, ..record() }).unwrap();
        }
        writer.flush().unwrap();

        let noise = std::fs::read_to_string(dir.path().join(NOISE_CHAIN)).unwrap();
        assert_eq!(noise.lines().count(), 5);
        let logl = std::fs::read_to_string(dir.path().join(LOGL_CHAIN)).unwrap();
        assert_eq!(logl.lines().count(), 5);
        let impacts = std::fs::read_to_string(dir.path().join(IMPACT_CHAIN)).unwrap();
        let iterations: Vec<&str> = impacts
            .lines()
            .filter_map(|row| row.split_whitespace().next())
            .collect();
        assert_eq!(iterations, ["0", "0", "1", "1", "2", "2", "3", "3", "4", "4"]);
    }

    #[test]
    fn fresh_run_truncates_earlier_rows() {
        let dir = tempfile::tempdir().unwrap();
        let injected = NoiseParameters::uniform(3, nominal_channel_noise());
        for _ in 0..2 {
            let mut writer = ChainWriter::create(dir.path(), injected.clone(), None).unwrap();
            writer.record(&record()).unwrap();
            writer.flush().unwrap();
        }
        let logl = std::fs::read_to_string(dir.path().join(LOGL_CHAIN)).unwrap();
        assert_eq!(logl.lines().count(), 1);
    }
}
