//! The `fbaModelServices` method catalogue
//!
//! One row per exposed method: its auth policy, the name of its single
//! object parameter, and the kind of value it promises to return. The table
//! is the only place the per-method auth contract is stated; the registry is
//! built by iterating it.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    auth::AuthPolicy,
    errors::{value_kind, HandlerError},
    rpc::{
        context::CallContext,
        registry::{MethodRegistry, ParamKind, ParamSpec, RegistryError, RpcHandler, Signature},
    },
    service::backend::ModelBackend,
};

pub const MODULE_NAME: &str = "fbaModelServices";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    List,
    Object,
    String,
}

impl ResultKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
            Self::String => value.is_string(),
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Object => "object",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: &'static str,
    pub auth: AuthPolicy,
    pub param: &'static str,
    pub result: &'static str,
    pub result_kind: ResultKind,
}

impl MethodSpec {
    const fn new(
        name: &'static str,
        auth: AuthPolicy,
        param: &'static str,
        result: &'static str,
        result_kind: ResultKind,
    ) -> Self {
        Self {
            name,
            auth,
            param,
            result,
            result_kind,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{MODULE_NAME}.{}", self.name)
    }

    pub fn signature(&self) -> Signature {
        Signature::new(vec![ParamSpec::required(self.param, ParamKind::Object)])
    }
}

#[rustfmt::skip]
pub const SERVICE_METHODS: &[MethodSpec] = &[
    MethodSpec::new("get_models", AuthPolicy::Optional, "input", "out_models", ResultKind::List),
    MethodSpec::new("get_fbas", AuthPolicy::Optional, "input", "out_fbas", ResultKind::List),
    MethodSpec::new("get_gapfills", AuthPolicy::Optional, "input", "out_gapfills", ResultKind::List),
    MethodSpec::new("get_gapgens", AuthPolicy::Optional, "input", "out_gapgens", ResultKind::List),
    MethodSpec::new("get_reactions", AuthPolicy::Optional, "input", "out_reactions", ResultKind::List),
    MethodSpec::new("get_compounds", AuthPolicy::Optional, "input", "out_compounds", ResultKind::List),
    MethodSpec::new("get_alias", AuthPolicy::Optional, "input", "output", ResultKind::List),
    MethodSpec::new("get_aliassets", AuthPolicy::Optional, "input", "aliassets", ResultKind::List),
    MethodSpec::new("get_media", AuthPolicy::Optional, "input", "out_media", ResultKind::List),
    MethodSpec::new("get_biochemistry", AuthPolicy::Optional, "input", "out_biochemistry", ResultKind::Object),
    MethodSpec::new("import_probanno", AuthPolicy::Required, "input", "probannoMeta", ResultKind::List),
    MethodSpec::new("genome_object_to_workspace", AuthPolicy::Required, "input", "genomeMeta", ResultKind::List),
    MethodSpec::new("genome_to_workspace", AuthPolicy::Required, "input", "genomeMeta", ResultKind::List),
    MethodSpec::new("domains_to_workspace", AuthPolicy::Required, "input", "GenomeDomainMeta", ResultKind::List),
    MethodSpec::new("compute_domains", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("add_feature_translation", AuthPolicy::Required, "input", "genomeMeta", ResultKind::List),
    MethodSpec::new("genome_to_fbamodel", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("translate_fbamodel", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("build_pangenome", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("genome_heatmap_from_pangenome", AuthPolicy::Required, "input", "output", ResultKind::Object),
    MethodSpec::new("ortholog_family_from_pangenome", AuthPolicy::Required, "input", "output", ResultKind::Object),
    MethodSpec::new("pangenome_to_proteome_comparison", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("import_fbamodel", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("export_fbamodel", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("export_object", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("export_genome", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("adjust_model_reaction", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("adjust_biomass_reaction", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("addmedia", AuthPolicy::Required, "input", "mediaMeta", ResultKind::List),
    MethodSpec::new("export_media", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("runfba", AuthPolicy::Required, "input", "fbaMeta", ResultKind::List),
    MethodSpec::new("generate_model_stats", AuthPolicy::Required, "input", "output", ResultKind::Object),
    MethodSpec::new("minimize_reactions", AuthPolicy::Required, "input", "fbaMeta", ResultKind::List),
    MethodSpec::new("export_fba", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("import_phenotypes", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("simulate_phenotypes", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("add_media_transporters", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("export_phenotypeSimulationSet", AuthPolicy::Optional, "input", "output", ResultKind::String),
    MethodSpec::new("integrate_reconciliation_solutions", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("queue_runfba", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("queue_gapfill_model", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("gapfill_model", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("queue_gapgen_model", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("gapgen_model", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("queue_wildtype_phenotype_reconciliation", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("queue_reconciliation_sensitivity_analysis", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("queue_combine_wildtype_phenotype_reconciliation", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("run_job", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("queue_job", AuthPolicy::Required, "input", "job", ResultKind::Object),
    MethodSpec::new("set_cofactors", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("find_reaction_synonyms", AuthPolicy::Optional, "input", "output", ResultKind::List),
    MethodSpec::new("role_to_reactions", AuthPolicy::Optional, "params", "output", ResultKind::List),
    MethodSpec::new("reaction_sensitivity_analysis", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("filter_iterative_solutions", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("delete_noncontributing_reactions", AuthPolicy::Required, "input", "output", ResultKind::List),
    MethodSpec::new("annotate_workspace_Genome", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("gtf_to_genome", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("fasta_to_ProteinSet", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("ProteinSet_to_Genome", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("fasta_to_ContigSet", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("ContigSet_to_Genome", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("probanno_to_genome", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("get_mapping", AuthPolicy::Optional, "params", "output", ResultKind::Object),
    MethodSpec::new("subsystem_of_roles", AuthPolicy::Optional, "params", "output", ResultKind::Object),
    MethodSpec::new("adjust_mapping_role", AuthPolicy::Required, "params", "output", ResultKind::Object),
    MethodSpec::new("adjust_mapping_complex", AuthPolicy::Required, "params", "output", ResultKind::Object),
    MethodSpec::new("adjust_mapping_subsystem", AuthPolicy::Required, "params", "output", ResultKind::Object),
    MethodSpec::new("get_template_model", AuthPolicy::Optional, "params", "output", ResultKind::Object),
    MethodSpec::new("import_template_fbamodel", AuthPolicy::Required, "input", "modelMeta", ResultKind::List),
    MethodSpec::new("adjust_template_reaction", AuthPolicy::Required, "params", "modelMeta", ResultKind::List),
    MethodSpec::new("adjust_template_biomass", AuthPolicy::Required, "params", "modelMeta", ResultKind::List),
    MethodSpec::new("add_stimuli", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("import_regulatory_model", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("compare_models", AuthPolicy::Optional, "params", "output", ResultKind::Object),
    MethodSpec::new("compare_genomes", AuthPolicy::Optional, "params", "output", ResultKind::List),
    MethodSpec::new("import_metagenome_annotation", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("models_to_community_model", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("metagenome_to_fbamodels", AuthPolicy::Required, "params", "outputs", ResultKind::List),
    MethodSpec::new("import_expression", AuthPolicy::Required, "input", "expression_meta", ResultKind::List),
    MethodSpec::new("import_regulome", AuthPolicy::Required, "input", "regulome_meta", ResultKind::List),
    MethodSpec::new("create_promconstraint", AuthPolicy::Required, "params", "promconstraint_meta", ResultKind::List),
    MethodSpec::new("add_biochemistry_compounds", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("update_object_references", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("add_reactions", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("remove_reactions", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("modify_reactions", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("add_features", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("remove_features", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("modify_features", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("import_trainingset", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("preload_trainingset", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("build_classifier", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("classify_genomes", AuthPolicy::Required, "params", "output", ResultKind::List),
    MethodSpec::new("build_tissue_model", AuthPolicy::Required, "params", "output", ResultKind::List),
];

/// Forwards one catalogue method to the backend and holds the backend to the
/// declared result kind.
pub struct CatalogHandler {
    spec: MethodSpec,
    backend: Arc<dyn ModelBackend>,
}

impl CatalogHandler {
    pub fn new(spec: MethodSpec, backend: Arc<dyn ModelBackend>) -> Self {
        Self { spec, backend }
    }
}

#[async_trait]
impl RpcHandler for CatalogHandler {
    async fn call(&self, ctx: &CallContext, args: Vec<Value>) -> Result<Value, HandlerError> {
        let input = args.into_iter().next().unwrap_or(Value::Null);
        let output = self.backend.invoke(ctx, self.spec.name, input).await?;

        if !self.spec.result_kind.matches(&output) {
            return Err(anyhow::anyhow!(
                "Method {} return value {} is not type {} as required. (got {})",
                self.spec.name,
                self.spec.result,
                self.spec.result_kind,
                value_kind(&output)
            )
            .into());
        }

        Ok(output)
    }
}

pub fn build_registry(backend: Arc<dyn ModelBackend>) -> Result<MethodRegistry, RegistryError> {
    let mut registry = MethodRegistry::new();
    for spec in SERVICE_METHODS {
        registry.register(
            spec.qualified_name(),
            Arc::new(CatalogHandler::new(*spec, backend.clone())),
            spec.signature(),
            spec.auth,
        )?;
    }
    Ok(registry)
}
