use crate::core::models::ids::{CompartmentId, ObjectId};
use crate::core::models::model::{Model, ModelError};
use crate::core::models::object::{Enz, Function, FunctionOutput, MMEnz, TargetMethod};
use crate::core::models::solver::SolverKind;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ModelFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
    #[error("Unknown compartment '{compartment}' referenced by '{object}'")]
    UnknownCompartment { object: String, compartment: String },
    #[error("Unresolved reference '{reference}' in '{object}'")]
    UnresolvedReference { object: String, reference: String },
    #[error("Invalid value in '{object}': {message}")]
    InvalidValue { object: String, message: String },
    #[error("Model construction failed: {source}")]
    Model {
        #[from]
        source: ModelError,
    },
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    compartment: Vec<CompartmentEntry>,
    #[serde(default)]
    solver: Vec<SolverEntry>,
    #[serde(default)]
    pool: Vec<PoolEntry>,
    #[serde(default)]
    reac: Vec<ReacEntry>,
    #[serde(default)]
    enz: Vec<EnzEntry>,
    #[serde(default)]
    mmenz: Vec<MMEnzEntry>,
    #[serde(default)]
    function: Vec<FunctionEntry>,
    #[serde(default)]
    other: Vec<OtherEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct CompartmentEntry {
    name: String,
    #[serde(default)]
    voxel_volumes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SolverEntry {
    name: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PoolEntry {
    name: String,
    compartment: String,
    #[serde(default)]
    conc_init: f64,
    #[serde(default)]
    buffered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReacEntry {
    name: String,
    compartment: String,
    #[serde(default)]
    kf: f64,
    #[serde(default)]
    kb: f64,
    #[serde(default)]
    substrates: Vec<String>,
    #[serde(default)]
    products: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnzEntry {
    name: String,
    compartment: String,
    k1: f64,
    k2: f64,
    k3: f64,
    enzyme: Option<String>,
    complex: Option<String>,
    #[serde(default)]
    substrates: Vec<String>,
    #[serde(default)]
    products: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MMEnzEntry {
    name: String,
    compartment: String,
    km: f64,
    kcat: f64,
    enzyme: Option<String>,
    #[serde(default)]
    substrates: Vec<String>,
    #[serde(default)]
    products: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FunctionEntry {
    name: String,
    compartment: String,
    expr: String,
    #[serde(default)]
    inputs: Vec<String>,
    /// Defaults to the number of inputs.
    num_vars: Option<usize>,
    target: Option<String>,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    TargetMethod::SetN.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OtherEntry {
    name: String,
    compartment: String,
    class: String,
}

/// Reads a model definition from a TOML file.
pub fn load(path: &Path) -> Result<Model, ModelFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ModelFileError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    parse(&content)
}

/// Builds a model from TOML text.
///
/// Pools and auxiliary objects are created first, then reactions, enzymes and
/// functions, so references may point at objects declared anywhere in the file. A
/// bare name refers to an object in the referring object's compartment; a name
/// starting with `/` is a full path.
pub fn parse(content: &str) -> Result<Model, ModelFileError> {
    let file: ModelFile = toml::from_str(content)?;
    let mut model = Model::new();

    for entry in &file.compartment {
        model.add_compartment(&entry.name, entry.voxel_volumes.clone());
    }
    for entry in &file.solver {
        let kind: SolverKind = entry
            .kind
            .parse()
            .map_err(|message| ModelFileError::InvalidValue {
                object: entry.name.clone(),
                message,
            })?;
        model.add_solver(&entry.name, kind)?;
    }

    for entry in &file.pool {
        let compt = compartment(&model, &entry.name, &entry.compartment)?;
        if entry.buffered {
            model.add_buf_pool(compt, &entry.name, entry.conc_init)?;
        } else {
            model.add_pool(compt, &entry.name, entry.conc_init)?;
        }
    }
    for entry in &file.other {
        let compt = compartment(&model, &entry.name, &entry.compartment)?;
        model.add_other(compt, &entry.name, &entry.class)?;
    }

    for entry in &file.reac {
        let resolver = Resolver::new(&model, &entry.name, &entry.compartment)?;
        let substrates = resolver.resolve_all(&entry.substrates)?;
        let products = resolver.resolve_all(&entry.products)?;
        let compt = resolver.compartment;
        model.add_reac(compt, &entry.name, entry.kf, entry.kb, substrates, products)?;
    }

    for entry in &file.enz {
        let resolver = Resolver::new(&model, &entry.name, &entry.compartment)?;
        let enz = Enz {
            k1: entry.k1,
            k2: entry.k2,
            k3: entry.k3,
            enzymes: resolver.resolve_all(entry.enzyme.as_slice())?,
            complex: entry
                .complex
                .as_deref()
                .map(|c| resolver.resolve(c))
                .transpose()?,
            substrates: resolver.resolve_all(&entry.substrates)?,
            products: resolver.resolve_all(&entry.products)?,
        };
        let compt = resolver.compartment;
        model.add_enz(compt, &entry.name, enz)?;
    }

    for entry in &file.mmenz {
        let resolver = Resolver::new(&model, &entry.name, &entry.compartment)?;
        let enz = MMEnz {
            km: entry.km,
            kcat: entry.kcat,
            enzymes: resolver.resolve_all(entry.enzyme.as_slice())?,
            substrates: resolver.resolve_all(&entry.substrates)?,
            products: resolver.resolve_all(&entry.products)?,
        };
        let compt = resolver.compartment;
        model.add_mmenz(compt, &entry.name, enz)?;
    }

    for entry in &file.function {
        let resolver = Resolver::new(&model, &entry.name, &entry.compartment)?;
        let method: TargetMethod = entry
            .method
            .parse()
            .map_err(|message| ModelFileError::InvalidValue {
                object: entry.name.clone(),
                message,
            })?;
        let num_vars = entry.num_vars.unwrap_or(entry.inputs.len());
        let mut function = Function::new(&entry.expr, num_vars);
        function.inputs = resolver.resolve_all(&entry.inputs)?;
        if let Some(target) = &entry.target {
            function.outputs.push(FunctionOutput {
                target: resolver.resolve(target)?,
                method,
            });
        }
        let compt = resolver.compartment;
        model.add_function(compt, &entry.name, function)?;
    }

    debug!(
        objects = model.objects_iter().count(),
        compartments = model.compartments_iter().count(),
        "Model definition parsed"
    );
    Ok(model)
}

fn compartment(model: &Model, object: &str, name: &str) -> Result<CompartmentId, ModelFileError> {
    model
        .find_compartment(name)
        .ok_or_else(|| ModelFileError::UnknownCompartment {
            object: object.to_string(),
            compartment: name.to_string(),
        })
}

struct Resolver<'a> {
    model: &'a Model,
    object: &'a str,
    compartment: CompartmentId,
    compartment_name: &'a str,
}

impl<'a> Resolver<'a> {
    fn new(
        model: &'a Model,
        object: &'a str,
        compartment_name: &'a str,
    ) -> Result<Self, ModelFileError> {
        Ok(Self {
            model,
            object,
            compartment: compartment(model, object, compartment_name)?,
            compartment_name,
        })
    }

    fn resolve(&self, reference: &str) -> Result<ObjectId, ModelFileError> {
        let path = if reference.starts_with('/') {
            reference.to_string()
        } else {
            format!("/{}/{}", self.compartment_name, reference)
        };
        self.model
            .find_by_path(&path)
            .ok_or_else(|| ModelFileError::UnresolvedReference {
                object: self.object.to_string(),
                reference: reference.to_string(),
            })
    }

    fn resolve_all(&self, references: &[String]) -> Result<Vec<ObjectId>, ModelFileError> {
        references.iter().map(|r| self.resolve(r)).collect()
    }
}
