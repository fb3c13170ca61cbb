use crate::core::models::schedule::ScheduleRegistry;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Options of a compiled reaction system.
#[derive(Debug, Clone, PartialEq)]
pub struct StoichConfig {
    /// Forces reversible reactions into two one-way terms (`Some(true)`) or one
    /// composite term (`Some(false)`). `None` lets the kinetic solver decide:
    /// stochastic solvers get one-way terms.
    pub one_way: Option<bool>,
    /// Lets voxel pool counts go below zero instead of clamping them.
    pub allow_negative: bool,
    /// Ticks restored to objects handed back to native control.
    pub schedule: ScheduleRegistry,
}

impl Default for StoichConfig {
    fn default() -> Self {
        Self {
            one_way: None,
            allow_negative: false,
            schedule: ScheduleRegistry::default(),
        }
    }
}

#[derive(Default)]
pub struct StoichConfigBuilder {
    one_way: Option<bool>,
    allow_negative: Option<bool>,
    schedule: Option<ScheduleRegistry>,
}

impl StoichConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn one_way(mut self, one_way: bool) -> Self {
        self.one_way = Some(one_way);
        self
    }
    pub fn allow_negative(mut self, allow: bool) -> Self {
        self.allow_negative = Some(allow);
        self
    }
    pub fn schedule(mut self, schedule: ScheduleRegistry) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn build(self) -> StoichConfig {
        StoichConfig {
            one_way: self.one_way,
            allow_negative: self.allow_negative.unwrap_or(false),
            schedule: self.schedule.unwrap_or_default(),
        }
    }
}

/// Which model objects make up the reaction system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReacSystemTarget {
    /// A wildcard path such as `/cyt/##`.
    Path(String),
    /// An explicit list of object paths.
    Elist(Vec<String>),
}

/// Everything needed to bind and compile one reaction system, by name.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub compartment: String,
    pub target: ReacSystemTarget,
    pub ksolve: Option<String>,
    pub dsolve: Option<String>,
    pub stoich: StoichConfig,
}

#[derive(Default)]
pub struct BuildConfigBuilder {
    compartment: Option<String>,
    target: Option<ReacSystemTarget>,
    ksolve: Option<String>,
    dsolve: Option<String>,
    stoich: Option<StoichConfig>,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compartment(mut self, name: &str) -> Self {
        self.compartment = Some(name.to_string());
        self
    }
    pub fn path(mut self, path: &str) -> Self {
        self.target = Some(ReacSystemTarget::Path(path.to_string()));
        self
    }
    pub fn elist(mut self, paths: Vec<String>) -> Self {
        self.target = Some(ReacSystemTarget::Elist(paths));
        self
    }
    pub fn ksolve(mut self, name: &str) -> Self {
        self.ksolve = Some(name.to_string());
        self
    }
    pub fn dsolve(mut self, name: &str) -> Self {
        self.dsolve = Some(name.to_string());
        self
    }
    pub fn stoich(mut self, config: StoichConfig) -> Self {
        self.stoich = Some(config);
        self
    }

    pub fn build(self) -> Result<BuildConfig, ConfigError> {
        let compartment = self
            .compartment
            .ok_or(ConfigError::MissingParameter("compartment"))?;
        if compartment.trim().is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "compartment",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(BuildConfig {
            compartment,
            target: self.target.ok_or(ConfigError::MissingParameter("path"))?,
            ksolve: self.ksolve,
            dsolve: self.dsolve,
            stoich: self.stoich.unwrap_or_default(),
        })
    }
}
