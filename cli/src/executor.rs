//! Executor (C10): orchestrates the full load -> plan -> apply pipeline,
//! one sequential pass in dependency order per the concurrency and
//! resource model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use eyre::{eyre, Result, WrapErr};
use tracing::instrument;

use hostcfg_core::facts::Facts;
use hostcfg_core::graph::{self, Graph};
use hostcfg_core::resources::{Action, Plan, Resource};
use hostcfg_core::schema::{self, ResourceBlock, RoleBlock, TopLevelBlock, VariableBlock};
use hostcfg_core::value::Value;
use hostcfg_core::{expr, registry, role, variables, EvalContext};

use crate::error::CliError;

/// The accumulated plan for every resource in the graph, in topological
/// order.
pub struct PlanResult {
    pub order: Vec<String>,
    pub plans: BTreeMap<String, Plan>,
    pub to_add: usize,
    pub to_change: usize,
    pub to_destroy: usize,
    pub to_skip: usize,
}

impl PlanResult {
    pub fn has_changes(&self) -> bool {
        self.to_add + self.to_change + self.to_destroy > 0
    }
}

/// Everything one CLI invocation needs to run the pipeline: where the
/// configuration lives, which variable sources were supplied.
pub struct Executor {
    pub base_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub var_files: Vec<PathBuf>,
    pub cli_vars: Vec<String>,
}

impl Executor {
    /// Step 1: resolve `--config` into a base directory plus the ordered
    /// list of `.hcl` files to parse.
    #[instrument]
    pub fn locate(config: Option<PathBuf>, var_files: Vec<PathBuf>, cli_vars: Vec<String>) -> Result<Executor> {
        let (base_dir, files) = match config {
            Some(path) if path.is_file() => (
                path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
                vec![path],
            ),
            Some(path) if path.is_dir() => {
                let files = hcl_files_in(&path)?;
                (path, files)
            }
            Some(path) => return Err(CliError::ConfigNotFound(path.display().to_string()).into()),
            None => {
                let cwd = std::env::current_dir()?;
                let default_file = cwd.join("hostcfg.hcl");
                if default_file.is_file() {
                    (cwd, vec![default_file])
                } else {
                    let files = hcl_files_in(&cwd)?;
                    (cwd, files)
                }
            }
        };

        Ok(Executor {
            base_dir,
            files,
            var_files,
            cli_vars,
        })
    }

    /// Steps 2-7: load variables, gather facts, parse, expand roles,
    /// two-pass decode, build the graph, and validate it through the
    /// topological sort. Parses and validates only — never reads the host.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<Graph> {
        let (graph, _order, _var_table, _fact_value) = self.build_graph()?;
        Ok(graph)
    }

    /// Steps 2-8: load variables, gather facts, parse, expand roles,
    /// two-pass decode, validate, plan. Returns the graph (needed by
    /// `apply`) and the accumulated `PlanResult`.
    #[instrument(skip(self))]
    pub fn plan(&self) -> Result<(Graph, PlanResult)> {
        let (graph, order, var_table, fact_value) = self.build_graph()?;

        let ctx = EvalContext::new(self.base_dir.clone())
            .with_namespace("var", Value::Object(var_table))
            .with_namespace("fact", fact_value);

        let mut plans = BTreeMap::new();
        let mut to_add = 0;
        let mut to_change = 0;
        let mut to_destroy = 0;
        let mut to_skip = 0;
        let mut node_ids = Vec::with_capacity(order.len());

        for idx in order {
            let node = graph.get(idx);
            let id = node.id();
            let current = node.read(&ctx).wrap_err_with(|| format!("failed to read {id}"))?;
            let plan = node.diff(&ctx, &current).wrap_err_with(|| format!("failed to diff {id}"))?;

            match plan.action {
                Action::Create => to_add += 1,
                Action::Update => to_change += 1,
                Action::Delete => to_destroy += 1,
                Action::Skip => to_skip += 1,
                Action::Noop => {}
            }

            node_ids.push(id.clone());
            plans.insert(id, plan);
        }

        Ok((
            graph,
            PlanResult {
                order: node_ids,
                plans,
                to_add,
                to_change,
                to_destroy,
                to_skip,
            },
        ))
    }

    /// Step 10: walk the graph in topological order again, applying every
    /// plan with changes. Stops at the first error; already-applied
    /// resources are not rolled back.
    #[instrument(skip(self, graph, result))]
    pub fn apply(&self, graph: &Graph, result: &PlanResult) -> Result<()> {
        let var_table = self.resolve_variables()?;
        let facts = Facts::gather();
        let ctx = EvalContext::new(self.base_dir.clone())
            .with_namespace("var", Value::Object(var_table))
            .with_namespace("fact", facts.to_value(true));

        for id in &result.order {
            let plan = &result.plans[id];
            if !plan.has_changes() {
                continue;
            }
            let idx = graph
                .index_of(id)
                .ok_or_else(|| eyre!("internal error: plan references unknown resource {id}"))?;
            let node = graph.get(idx);
            node.apply(&ctx, plan, true).wrap_err_with(|| format!("failed to apply {id}"))?;
        }
        Ok(())
    }

    /// Steps 2-7, shared by `validate` and `plan`: load variables, gather
    /// facts, parse, expand roles, two-pass decode, build the graph,
    /// validate it, and compute the topological order. Stops short of any
    /// `Resource::read` call.
    fn build_graph(&self) -> Result<(Graph, Vec<usize>, BTreeMap<String, Value>, Value)> {
        let var_table = self.resolve_variables()?;
        let facts = Facts::gather();
        let fact_value = facts.to_value(true);

        let blocks = self.parse_blocks()?;
        let (_variable_blocks, mut resource_blocks, role_blocks) = split_blocks(blocks);

        let cli_override_map = variables::merge_cli_assignments(&self.cli_vars)?;
        let mut role_members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for role_block in &role_blocks {
            let loaded = role::load(role_block, &self.base_dir, &cli_override_map)
                .wrap_err_with(|| format!("loading role \"{}\"", role_block.name))?;
            role_members.insert(loaded.name.clone(), loaded.member_ids());
            resource_blocks.extend(loaded.resources);
        }

        let nodes = self.two_pass_decode(resource_blocks, &var_table, &fact_value, &role_members)?;
        let graph = Graph::build(nodes);
        graph.validate().map_err(|e| eyre!(e))?;
        let order = graph.topological_order().map_err(|e| eyre!(e))?;

        Ok((graph, order, var_table, fact_value))
    }

    #[instrument(skip(self))]
    fn resolve_variables(&self) -> Result<BTreeMap<String, Value>> {
        let blocks = self.parse_blocks()?;
        let (variable_blocks, _, _) = split_blocks(blocks);

        let mut layers = Vec::new();
        for path in variables::auto_load_paths(&self.base_dir) {
            layers.push(variables::load_var_file(&path)?);
        }
        for path in &self.var_files {
            layers.push(variables::load_var_file(path)?);
        }
        let file_assignments = variables::merge_layers(layers);
        let cli_assignments = variables::merge_cli_assignments(&self.cli_vars)?;

        Ok(variables::resolve(&variable_blocks, &file_assignments, &cli_assignments)?)
    }

    fn parse_blocks(&self) -> Result<Vec<TopLevelBlock>> {
        let mut out = Vec::new();
        for path in &self.files {
            let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
            let body: hcl::Body =
                hcl::from_str(&text).map_err(|e| eyre!("parse error in {}: {e}", path.display()))?;
            out.extend(schema::decode_body(body)?);
        }
        Ok(out)
    }

    /// The two-pass decode, run uniformly over every top-level and role
    /// resource block: a best-effort pass projects a shallow
    /// `resources[type][name]` namespace, then an authoritative pass
    /// materializes each resource through the registry.
    fn two_pass_decode(
        &self,
        blocks: Vec<ResourceBlock>,
        var_table: &BTreeMap<String, Value>,
        fact_value: &Value,
        role_members: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<Box<dyn Resource>>> {
        let mut projections: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();

        for block in &blocks {
            let ctx = self.resource_context(block, var_table, fact_value, &projections, true);
            let attrs = expr::eval_body(&block.body, &ctx)?;
            projections
                .entry(block.type_label.clone())
                .or_default()
                .insert(block.name_label.clone(), Value::Object(attrs));
        }

        let mut nodes = Vec::with_capacity(blocks.len());
        for block in blocks {
            let ctx = self.resource_context(&block, var_table, fact_value, &projections, false);
            let implicit = expr::find_resource_references(&block.body);
            let mut dependencies = block.depends_on.clone();
            for dep in implicit {
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
            dependencies = graph::expand_role_dependencies(&dependencies, role_members);

            let node = registry::create(&block, dependencies, &ctx)
                .wrap_err_with(|| format!("decoding {}.{}", block.type_label, block.name_label))?;
            node.validate().wrap_err_with(|| format!("validating {}", node.id()))?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn resource_context(
        &self,
        block: &ResourceBlock,
        var_table: &BTreeMap<String, Value>,
        fact_value: &Value,
        projections: &BTreeMap<String, BTreeMap<String, Value>>,
        best_effort: bool,
    ) -> EvalContext {
        let base_dir = block.base_dir.clone().unwrap_or_else(|| self.base_dir.clone());
        let vars = block
            .var_scope
            .clone()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(var_table.clone()));

        let mut ctx = EvalContext::new(base_dir)
            .with_namespace("var", vars)
            .with_namespace("fact", fact_value.clone());
        for (ty, names) in projections {
            ctx.set_namespace(ty.clone(), Value::Object(names.clone()));
        }
        if best_effort {
            ctx = ctx.best_effort();
        }
        ctx
    }
}

fn split_blocks(blocks: Vec<TopLevelBlock>) -> (Vec<VariableBlock>, Vec<ResourceBlock>, Vec<RoleBlock>) {
    let mut variables = Vec::new();
    let mut resources = Vec::new();
    let mut roles = Vec::new();
    for block in blocks {
        match block {
            TopLevelBlock::Variable(v) => variables.push(v),
            TopLevelBlock::Resource(r) => resources.push(r),
            TopLevelBlock::Role(r) => roles.push(r),
        }
    }
    (variables, resources, roles)
}

fn hcl_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("reading directory {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("hcl")
                && !p
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".vars.hcl"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(CliError::NoHclFiles(dir.display().to_string()).into());
    }
    Ok(files)
}
