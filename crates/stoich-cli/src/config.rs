use crate::cli::{CompileArgs, ReactionMode};
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use stoichkit::engine::config as core_config;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialStoichOptions {
    one_way: Option<bool>,
    allow_negative: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialBuildConfig {
    compartment: Option<String>,
    path: Option<String>,
    elist: Option<Vec<String>>,
    ksolve: Option<String>,
    dsolve: Option<String>,
    options: Option<PartialStoichOptions>,
}

impl PartialBuildConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &CompileArgs) -> Result<core_config::BuildConfig> {
        self.apply_set_values(&args.set_values)?;

        let options = self.options.take().unwrap_or_default();
        let stoich = Self::merge_stoich_options(args.mode, args.allow_negative, options);

        let mut builder = core_config::BuildConfigBuilder::new().stoich(stoich);
        if let Some(compartment) = &self.compartment {
            builder = builder.compartment(compartment);
        }
        builder = match (self.path, self.elist) {
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "`path` and `elist` are mutually exclusive.".to_string(),
                ));
            }
            (Some(path), None) => builder.path(&path),
            (None, Some(elist)) => builder.elist(elist),
            (None, None) => builder,
        };
        if let Some(ksolve) = &self.ksolve {
            builder = builder.ksolve(ksolve);
        }
        if let Some(dsolve) = &self.dsolve {
            builder = builder.dsolve(dsolve);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_stoich_options(
        mode: ReactionMode,
        cli_allow_negative: bool,
        file: PartialStoichOptions,
    ) -> core_config::StoichConfig {
        let mut builder = core_config::StoichConfigBuilder::new()
            .allow_negative(cli_allow_negative || file.allow_negative.unwrap_or(false));
        if mode.one_way {
            builder = builder.one_way(true);
        } else if mode.combined {
            builder = builder.one_way(false);
        } else if let Some(val) = file.one_way {
            builder = builder.one_way(val);
        }
        builder.build()
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let parse_bool = || -> Result<bool> {
                value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })
            };

            match key {
                "compartment" => self.compartment = Some(value_str.to_string()),
                "path" => {
                    self.path = Some(value_str.to_string());
                    self.elist = None;
                }
                "ksolve" => self.ksolve = Some(value_str.to_string()),
                "dsolve" => self.dsolve = Some(value_str.to_string()),
                "options.one-way" => {
                    self.options.get_or_insert_with(Default::default).one_way = Some(parse_bool()?);
                }
                "options.allow-negative" => {
                    self.options
                        .get_or_insert_with(Default::default)
                        .allow_negative = Some(parse_bool()?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
