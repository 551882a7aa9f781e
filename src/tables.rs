use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::{distributions::Uniform, prelude::Distribution, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Dimensions, GridState};

/// State values indexed `[y][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable {
    values: Vec<Vec<f64>>,
}

/// Action preferences indexed `[y][x][action]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable {
    preferences: Vec<Vec<Vec<f64>>>,
}

impl ValueTable {
    pub fn zeros(dimensions: Dimensions) -> Self {
        Self {
            values: vec![vec![0.0; dimensions.width]; dimensions.height],
        }
    }

    pub fn get(&self, state: GridState) -> f64 {
        self.values[state.y][state.x]
    }

    pub fn add(&mut self, state: GridState, delta: f64) {
        self.values[state.y][state.x] += delta;
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn check_shape(&self, dimensions: Dimensions) -> Result<()> {
        if self.values.len() != dimensions.height
            || self.values.iter().any(|row| row.len() != dimensions.width)
        {
            return Err(Error::configuration(format!(
                "value table shape does not match {}x{} grid",
                dimensions.width, dimensions.height
            )));
        }

        Ok(())
    }

    pub fn load_or_zeros(path: &Path, dimensions: Dimensions) -> Result<Self> {
        match read_json::<ValueTable>(path)? {
            Some(table) => {
                table.check_shape(dimensions)?;
                Ok(table)
            }
            None => Ok(Self::zeros(dimensions)),
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

impl PolicyTable {
    pub fn constant(dimensions: Dimensions, num_actions: usize, value: f64) -> Self {
        Self {
            preferences: vec![vec![vec![value; num_actions]; dimensions.width]; dimensions.height],
        }
    }

    /// Independent uniform draws from `[0, max_preference)`.
    pub fn randomized<R: Rng>(
        dimensions: Dimensions,
        num_actions: usize,
        max_preference: f64,
        rng: &mut R,
    ) -> Self {
        let dist = Uniform::new(0.0, max_preference);
        let mut table = Self::constant(dimensions, num_actions, 0.0);

        for preference in table.preferences.iter_mut().flatten().flatten() {
            *preference = dist.sample(rng);
        }

        table
    }

    pub fn row(&self, state: GridState) -> &[f64] {
        &self.preferences[state.y][state.x]
    }

    pub fn get(&self, state: GridState, action_idx: usize) -> f64 {
        self.preferences[state.y][state.x][action_idx]
    }

    pub fn set(&mut self, state: GridState, action_idx: usize, value: f64) {
        self.preferences[state.y][state.x][action_idx] = value;
    }

    pub fn add(&mut self, state: GridState, action_idx: usize, delta: f64) {
        self.preferences[state.y][state.x][action_idx] += delta;
    }

    pub fn num_actions(&self) -> usize {
        self.preferences
            .first()
            .and_then(|row| row.first())
            .map(|cell| cell.len())
            .unwrap_or(0)
    }

    pub fn check_shape(&self, dimensions: Dimensions, num_actions: usize) -> Result<()> {
        let shape_ok = self.preferences.len() == dimensions.height
            && self.preferences.iter().all(|row| {
                row.len() == dimensions.width && row.iter().all(|cell| cell.len() == num_actions)
            });

        if !shape_ok {
            return Err(Error::configuration(format!(
                "policy table shape does not match {}x{} grid with {} actions",
                dimensions.width, dimensions.height, num_actions
            )));
        }

        Ok(())
    }

    pub fn load_or_else(
        path: &Path,
        dimensions: Dimensions,
        num_actions: usize,
        init: impl FnOnce() -> PolicyTable,
    ) -> Result<Self> {
        match read_json::<PolicyTable>(path)? {
            Some(table) => {
                table.check_shape(dimensions, num_actions)?;
                Ok(table)
            }
            None => Ok(init()),
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| Error::configuration(format!("malformed table {}: {}", path.display(), err)))
}

// whole-file overwrite through a sibling temp file, so readers never see a torn table
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|err| Error::configuration(format!("cannot encode table: {}", err)))?;

    let tmp_path = temp_path(path);
    fs::write(&tmp_path, json).map_err(|source| Error::Io {
        path: tmp_path.clone(),
        source,
    })?;

    if let Err(source) = fs::rename(&tmp_path, path) {
        if let Err(err) = fs::remove_file(&tmp_path) {
            log::warn!("cannot remove {}: {}", tmp_path.display(), err);
        }

        return Err(Error::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}
