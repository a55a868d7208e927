//! Wiring-spec input rows.
//!
//! The on-disk form of a wiring spec is a tolerant JSON document:
//! unknown fields are ignored and most fields default. Conversion into
//! the kernel model enforces the construction invariants; provider rows
//! are carried through opaquely for the runtime layer to interpret.

use crate::builder::WiringSpec;
use crate::error::GraphError;
use serde::Deserialize;
use serde_json::Value;
use solder_kernel::{
    Binding, BindingId, ComponentDecl, DependencyRequest, Key, ModuleDecl, ScopeTag,
};
use std::collections::BTreeMap;

pub const WIRING_SPEC_KIND: &str = "solder.wiring_spec.v1";

/// How the CLI produces a value for a user binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRow {
    /// `literal` (fixed value) or `record` (object of dependency
    /// values keyed by canonical key).
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiringSpecInput {
    #[serde(default)]
    pub schema: u32,
    #[serde(default)]
    pub spec_kind: String,
    #[serde(default)]
    pub modules: Vec<ModuleRow>,
    pub root: ComponentRow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bindings: Vec<BindingRow>,
    #[serde(default)]
    pub collections: Vec<KeyRow>,
    #[serde(default)]
    pub optionals: Vec<KeyRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    /// `constructor`, `factory`, or `alias`. Defaults to `factory`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRow>,
    #[serde(default)]
    pub into_collection: bool,
    #[serde(default)]
    pub provider: Option<ProviderRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRow {
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub deferred: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRow {
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub qualifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub entry_points: Vec<DependencyRow>,
    #[serde(default)]
    pub subcomponents: Vec<ComponentRow>,
}

/// Provider rows by binding id, carried alongside the converted spec.
pub type ProviderRows = BTreeMap<BindingId, ProviderRow>;

impl WiringSpecInput {
    /// Convert the tolerant rows into the kernel model.
    pub fn into_spec(self) -> Result<(WiringSpec, ProviderRows), GraphError> {
        let mut providers = ProviderRows::new();
        let mut modules = Vec::with_capacity(self.modules.len());
        for row in self.modules {
            modules.push(convert_module(row, &mut providers)?);
        }
        let root = convert_component(self.root)?;
        Ok((WiringSpec { modules, root }, providers))
    }
}

fn convert_key_row(type_name: &str, qualifier: Option<&str>) -> Result<Key, GraphError> {
    Ok(Key::qualified(type_name, qualifier.unwrap_or_default())?)
}

fn convert_request(row: &DependencyRow) -> Result<DependencyRequest, GraphError> {
    let key = convert_key_row(&row.type_name, row.qualifier.as_deref())?;
    Ok(if row.deferred {
        DependencyRequest::deferred(key)
    } else {
        DependencyRequest::direct(key)
    })
}

fn convert_module(
    row: ModuleRow,
    providers: &mut ProviderRows,
) -> Result<ModuleDecl, GraphError> {
    let mut bindings = Vec::with_capacity(row.bindings.len());
    for binding_row in row.bindings {
        bindings.push(convert_binding(binding_row, providers)?);
    }
    let mut module = ModuleDecl::new(row.name, bindings)?;
    for key_row in &row.collections {
        module = module.with_collection(convert_key_row(
            &key_row.type_name,
            key_row.qualifier.as_deref(),
        )?);
    }
    for key_row in &row.optionals {
        module = module.with_optional(convert_key_row(
            &key_row.type_name,
            key_row.qualifier.as_deref(),
        )?);
    }
    Ok(module)
}

fn convert_binding(
    row: BindingRow,
    providers: &mut ProviderRows,
) -> Result<Binding, GraphError> {
    let key = convert_key_row(&row.type_name, row.qualifier.as_deref())?;
    let requests: Vec<DependencyRequest> = row
        .dependencies
        .iter()
        .map(convert_request)
        .collect::<Result<_, _>>()?;

    let kind = row.kind.as_deref().unwrap_or("factory");
    let mut binding = match kind {
        "constructor" => Binding::constructor(&row.id, key, requests)?,
        "factory" => Binding::factory(&row.id, key, requests)?,
        "alias" => {
            let mut requests = requests;
            if requests.len() != 1 {
                return Err(GraphError::MalformedAlias {
                    binding_id: row.id.clone(),
                });
            }
            Binding::alias(&row.id, key, requests.remove(0).key)?
        }
        other => {
            return Err(GraphError::UnknownBindingKind {
                binding_id: row.id.clone(),
                kind: other.to_string(),
            });
        }
    };

    if let Some(scope) = row.scope.as_deref()
        && !scope.trim().is_empty()
    {
        binding = binding.scoped(ScopeTag::new(scope.trim()));
    }
    if row.into_collection {
        binding = binding.contributing();
    }
    if let Some(provider) = row.provider {
        providers.insert(binding.id.clone(), provider);
    }
    Ok(binding)
}

fn convert_component(row: ComponentRow) -> Result<ComponentDecl, GraphError> {
    let mut decl = ComponentDecl::new(row.name)?;
    for scope in &row.scopes {
        if !scope.trim().is_empty() {
            decl = decl.with_scope(ScopeTag::new(scope.trim()));
        }
    }
    for module in row.modules {
        decl = decl.with_module(module);
    }
    for request in &row.entry_points {
        decl = decl.with_entry_point(convert_request(request)?);
    }
    for child in row.subcomponents {
        decl = decl.with_subcomponent(convert_component(child)?);
    }
    Ok(decl)
}
