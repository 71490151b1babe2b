use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use qgrid_core::{TimeStep, TimeWindow};
use qgrid_io::{DemandRequest, PlantCategory};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub scenario: ScenarioSpec,
    pub infrastructure: InfrastructureSpec,
    #[serde(default)]
    pub paths: PathsSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub step: TimeStep,
    #[serde(default = "default_weather")]
    pub weather: String,
    #[serde(default = "default_consumption")]
    pub consumption: String,
    #[serde(default = "default_customer_class")]
    pub customer_class: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub daily_resample: bool,
    #[serde(default = "default_true")]
    pub interconnection: bool,
}

/// Plant ids per category as comma-separated lists; an absent list selects
/// every plant of the category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfrastructureSpec {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub wind: Option<String>,
    #[serde(default)]
    pub solar: Option<String>,
    #[serde(default)]
    pub hydro: Option<String>,
    #[serde(default)]
    pub nuclear: Option<String>,
    #[serde(default)]
    pub thermal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSpec {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_weather() -> String {
    "typical".to_string()
}

fn default_consumption() -> String {
    "reference".to_string()
}

fn default_customer_class() -> String {
    "all".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl Default for PathsSpec {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl PathsSpec {
    /// Resolve relative paths against `base` (usually the document's directory).
    pub fn resolved_against(&self, base: &Path) -> PathsSpec {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        PathsSpec {
            data_dir: join(&self.data_dir),
            cache_dir: join(&self.cache_dir),
            output_dir: join(&self.output_dir),
        }
    }

    pub fn topology_dir(&self) -> PathBuf {
        self.data_dir.join("topology")
    }

    pub fn infrastructure_dir(&self) -> PathBuf {
        self.data_dir.join("infrastructure")
    }

    pub fn production_dir(&self) -> PathBuf {
        self.data_dir.join("production")
    }

    pub fn demand_file(&self) -> PathBuf {
        self.data_dir.join("demand.csv")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub window: TimeWindow,
    pub weather: String,
    pub consumption: String,
    pub customer_class: String,
    pub seed: u64,
    pub daily_resample: bool,
    pub interconnection: bool,
}

impl ResolvedScenario {
    pub fn year(&self) -> i32 {
        self.window.year()
    }

    pub fn demand_request(&self) -> DemandRequest {
        DemandRequest {
            weather: self.weather.clone(),
            consumption: self.consumption.clone(),
            customer_class: self.customer_class.clone(),
            window: self.window,
        }
    }
}

/// Parsed infrastructure selection. `None` selects the whole category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureSelection {
    pub id: u32,
    pub name: String,
    pub wind: Option<Vec<u32>>,
    pub solar: Option<Vec<u32>>,
    pub hydro: Option<Vec<u32>>,
    pub nuclear: Option<Vec<u32>>,
    pub thermal: Option<Vec<u32>>,
}

impl InfrastructureSelection {
    /// Select every plant of every category.
    pub fn all(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn ids(&self, category: PlantCategory) -> Option<&[u32]> {
        match category {
            PlantCategory::Wind => self.wind.as_deref(),
            PlantCategory::Solar => self.solar.as_deref(),
            PlantCategory::Hydro => self.hydro.as_deref(),
            PlantCategory::Nuclear => self.nuclear.as_deref(),
            PlantCategory::Thermal => self.thermal.as_deref(),
        }
    }

    /// Canonical JSON of the selection contents, used in cache keys.
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

pub fn load_document_from_path(path: &Path) -> Result<ScenarioDocument> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario document '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario document yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario document json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario document"),
    }
}

pub fn resolve_scenario(spec: &ScenarioSpec) -> Result<ResolvedScenario> {
    if spec.name.trim().is_empty() {
        return Err(anyhow!("scenario {} must have a name", spec.id));
    }
    let start = parse_datetime(&spec.start)
        .with_context(|| format!("parsing start of scenario '{}'", spec.name))?;
    let end = parse_datetime(&spec.end)
        .with_context(|| format!("parsing end of scenario '{}'", spec.name))?;
    let window = TimeWindow::new(start, end, spec.step)
        .with_context(|| format!("scenario '{}'", spec.name))?;
    Ok(ResolvedScenario {
        id: spec.id,
        name: spec.name.clone(),
        description: spec.description.clone(),
        window,
        weather: spec.weather.clone(),
        consumption: spec.consumption.clone(),
        customer_class: spec.customer_class.clone(),
        seed: spec.seed,
        daily_resample: spec.daily_resample,
        interconnection: spec.interconnection,
    })
}

pub fn resolve_selection(spec: &InfrastructureSpec) -> Result<InfrastructureSelection> {
    let parse = |list: &Option<String>, category: &str| -> Result<Option<Vec<u32>>> {
        list.as_deref()
            .map(|raw| {
                parse_id_list(raw).with_context(|| {
                    format!("parsing {} ids of infrastructure '{}'", category, spec.name)
                })
            })
            .transpose()
    };
    Ok(InfrastructureSelection {
        id: spec.id,
        name: spec.name.clone(),
        wind: parse(&spec.wind, "wind")?,
        solar: parse(&spec.solar, "solar")?,
        hydro: parse(&spec.hydro, "hydro")?,
        nuclear: parse(&spec.nuclear, "nuclear")?,
        thermal: parse(&spec.thermal, "thermal")?,
    })
}

pub fn resolve(doc: &ScenarioDocument) -> Result<(ResolvedScenario, InfrastructureSelection)> {
    Ok((
        resolve_scenario(&doc.scenario)?,
        resolve_selection(&doc.infrastructure)?,
    ))
}

pub fn validate(doc: &ScenarioDocument) -> Result<()> {
    resolve(doc).map(|_| ())
}

/// Comma-separated integer ids; blanks are ignored.
pub fn parse_id_list(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("invalid id '{s}'"))
        })
        .collect()
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("unrecognised date '{value}'; use RFC3339 or YYYY-MM-DD"))
}
