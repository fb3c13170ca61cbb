use crate::core::models::ids::{ObjectId, SolverId};
use crate::core::models::model::Model;
use crate::engine::config::{BuildConfig, ReacSystemTarget};
use crate::engine::error::StoichError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::status::Status;
use crate::engine::stoich::Stoich;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unknown compartment '{0}'")]
    UnknownCompartment(String),

    #[error("Unknown solver '{0}'")]
    UnknownSolver(String),

    #[error("Unknown object '{0}'")]
    UnknownObject(String),

    #[error("Compilation failed: {source}")]
    Stoich {
        #[from]
        source: StoichError,
    },
}

/// A compiled reaction system together with its summary.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub stoich: Stoich,
    pub report: CompileReport,
}

/// Serializable summary of a compiled reaction system.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompileReport {
    pub compartment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub status: i32,
    pub one_way: bool,
    pub num_var_pools: usize,
    pub num_buf_pools: usize,
    pub num_func_pools: usize,
    pub num_proxy_pools: usize,
    pub num_all_pools: usize,
    pub num_rates: usize,
    pub num_core_rates: usize,
    pub num_entries: usize,
    pub pools: Vec<PoolReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<ProxyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<MatrixReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolReport {
    pub path: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyReport {
    pub compartment: String,
    pub pools: Vec<String>,
}

/// The stoichiometry matrix in compressed sparse row form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatrixReport {
    pub nrows: usize,
    pub ncols: usize,
    pub matrix_entry: Vec<i32>,
    pub col_index: Vec<usize>,
    pub row_start: Vec<usize>,
}

impl CompileReport {
    fn from_stoich(model: &Model, stoich: &Stoich) -> Self {
        let name_of = |id: ObjectId| model.path_of(id).unwrap_or_else(|| format!("{id:?}"));
        let compartment = stoich
            .compartment()
            .and_then(|c| model.compartment(c))
            .map(|c| c.name.clone())
            .unwrap_or_default();

        let pools = stoich
            .pool_id_map()
            .into_iter()
            .map(|(id, index)| PoolReport {
                path: name_of(id),
                index,
            })
            .collect();
        let proxies = stoich
            .off_solver_compartments()
            .into_iter()
            .map(|c| ProxyReport {
                compartment: model
                    .compartment(c)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                pools: stoich.proxy_pools(c).iter().map(|&p| name_of(p)).collect(),
            })
            .collect();

        Self {
            compartment,
            path: stoich.path().to_string(),
            status: stoich.status().bits(),
            one_way: stoich.one_way(),
            num_var_pools: stoich.num_var_pools(),
            num_buf_pools: stoich.num_buf_pools(),
            num_func_pools: stoich.num_func_pools(),
            num_proxy_pools: stoich.num_proxy_pools(),
            num_all_pools: stoich.num_all_pools(),
            num_rates: stoich.num_rates(),
            num_core_rates: stoich.num_core_rates(),
            num_entries: stoich.matrix().nnz(),
            pools,
            proxies,
            matrix: None,
        }
    }

    /// Adds the full stoichiometry matrix to the report.
    pub fn attach_matrix(&mut self, stoich: &Stoich) {
        let matrix = stoich.matrix();
        self.matrix = Some(MatrixReport {
            nrows: matrix.nrows(),
            ncols: matrix.ncols(),
            matrix_entry: stoich.matrix_entry().to_vec(),
            col_index: stoich.col_index().to_vec(),
            row_start: stoich.row_start().to_vec(),
        });
    }
}

#[instrument(skip_all, name = "compile_workflow")]
pub fn run(
    model: &mut Model,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<CompileResult, WorkflowError> {
    // === Phase 1: Bind compartment and solvers ===
    let mut stoich = reporter.phase("Binding", || bind(model, config))?;

    // === Phase 2: Compile the reaction system ===
    reporter.report(Progress::PhaseStart { name: "Compiling" });
    let status = match &config.target {
        ReacSystemTarget::Path(path) => stoich.set_reac_system_path(model, path)?,
        ReacSystemTarget::Elist(paths) => {
            let elist = resolve_elist(model, paths)?;
            stoich.set_elist(model, &elist)?
        }
    };
    reporter.report(Progress::PhaseFinish);

    if status != Status::OK {
        warn!(status = %status, "Reaction system compiled with warnings.");
        reporter.report(Progress::Message(format!(
            "Compiled with status {}",
            status.bits()
        )));
    }

    // === Phase 3: Summarize ===
    let report = reporter.phase("Summarizing", || CompileReport::from_stoich(model, &stoich));
    info!(
        status = report.status,
        pools = report.num_all_pools,
        rates = report.num_rates,
        "Workflow complete."
    );
    Ok(CompileResult { stoich, report })
}

fn bind(model: &mut Model, config: &BuildConfig) -> Result<Stoich, WorkflowError> {
    let compartment = model
        .find_compartment(&config.compartment)
        .ok_or_else(|| WorkflowError::UnknownCompartment(config.compartment.clone()))?;
    let ksolve = find_solver(model, config.ksolve.as_deref())?;
    let dsolve = find_solver(model, config.dsolve.as_deref())?;

    let name = format!("{}.stoich", config.compartment);
    let mut stoich = Stoich::new(model, &name, config.stoich.clone());
    stoich.set_compartment(model, compartment)?;
    if let Some(ksolve) = ksolve {
        stoich.set_ksolve(model, ksolve)?;
    }
    if let Some(dsolve) = dsolve {
        stoich.set_dsolve(model, dsolve)?;
    }
    info!(
        compartment = %config.compartment,
        one_way = stoich.one_way(),
        "Bound reaction system."
    );
    Ok(stoich)
}

fn find_solver(model: &Model, name: Option<&str>) -> Result<Option<SolverId>, WorkflowError> {
    name.map(|name| {
        model
            .find_solver(name)
            .ok_or_else(|| WorkflowError::UnknownSolver(name.to_string()))
    })
    .transpose()
}

fn resolve_elist(model: &Model, paths: &[String]) -> Result<Vec<ObjectId>, WorkflowError> {
    paths
        .iter()
        .map(|path| {
            model
                .find_by_path(path)
                .ok_or_else(|| WorkflowError::UnknownObject(path.clone()))
        })
        .collect()
}
