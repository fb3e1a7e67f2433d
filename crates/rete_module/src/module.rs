//! Module table: resolves construct names across modules honouring
//! explicit import/export ports, with MAIN predefined and redefinable
//! exactly once.

use crate::port::{ConstructType, NameScope, PortItem};
use rete_base::{Environment, ErrorKind, Result, Span, SpannedError};
use std::collections::{HashMap, HashSet};

/// Name of the module every construct belongs to unless declared otherwise.
pub const MAIN_MODULE: &str = "MAIN";

#[derive(Debug, Clone, Default)]
struct Module {
    imports: Vec<PortItem>,
    exports: Vec<PortItem>,
    constructs: HashMap<ConstructType, HashSet<String>>,
}

impl Module {
    fn defines(&self, construct_type: ConstructType, name: &str) -> bool {
        self.constructs
            .get(&construct_type)
            .is_some_and(|names| names.contains(name))
    }

    fn exports(&self, construct_type: ConstructType, name: &str) -> bool {
        self.exports.iter().any(|p| p.covers(construct_type, name))
    }
}

/// Owns every module's import/export ports and locally-defined constructs;
/// resolves a `(construct_type, name)` lookup from a given module to the
/// single module that actually defines it.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: HashMap<String, Module>,
    order: Vec<String>,
    main_redefined: bool,
}

impl ModuleTable {
    pub fn new() -> Self {
        let mut table = ModuleTable {
            modules: HashMap::new(),
            order: Vec::new(),
            main_redefined: false,
        };
        table.modules.insert(MAIN_MODULE.to_string(), Module::default());
        table.order.push(MAIN_MODULE.to_string());
        table
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Defines a new, empty module. Defining `MAIN` again is only
    /// permitted once, and only before it has gained any imports/exports
    /// (the predefined module may be redefined with initial ports exactly
    /// one time).
    pub fn define_module(&mut self, name: &str) -> Result<()> {
        if name == MAIN_MODULE {
            let main = self.modules.get(MAIN_MODULE).expect("MAIN always present");
            if self.main_redefined || !main.imports.is_empty() || !main.exports.is_empty() {
                return Err(SpannedError::semantic(
                    "MAIN may only be redefined once, before it has any imports or exports",
                    Span::default(),
                ));
            }
            self.main_redefined = true;
            log::debug!("redefining predefined module MAIN");
            return Ok(());
        }
        if self.modules.contains_key(name) {
            return Err(SpannedError::semantic(
                format!("module '{name}' is already defined"),
                Span::default(),
            ));
        }
        self.modules.insert(name.to_string(), Module::default());
        self.order.push(name.to_string());
        log::debug!("defined module '{name}'");
        Ok(())
    }

    /// Records that `module` directly defines `(construct_type, name)`,
    /// making it eligible for export.
    pub fn declare_construct(
        &mut self,
        module: &str,
        construct_type: ConstructType,
        name: &str,
    ) -> Result<()> {
        let m = self.module_mut(module)?;
        m.constructs
            .entry(construct_type)
            .or_default()
            .insert(name.to_string());
        Ok(())
    }

    pub fn add_export(&mut self, module: &str, port: PortItem) -> Result<()> {
        let m = self.module_mut(module)?;
        m.exports.push(port);
        Ok(())
    }

    /// Adds an import port to `module`, validating it and rolling back to
    /// the pre-import snapshot on any failure: the source module must
    /// exist, must export the named construct(s), and the construct must
    /// actually be defined there. After the import is (tentatively) added,
    /// every construct now visible in `module` is re-resolved; if adding
    /// this import causes any name to resolve through more than one path,
    /// the whole operation is rolled back.
    ///
    /// `env` is polled for a requested halt at the top of the multi-import
    /// scan below; a halt mid-scan aborts with the import rolled back, the
    /// same as any other conflict.
    pub fn add_import(&mut self, module: &str, port: PortItem, env: &Environment) -> Result<()> {
        if !self.modules.contains_key(module) {
            return Err(SpannedError::semantic(
                format!("module '{module}' is not defined"),
                Span::default(),
            ));
        }
        let source = self.modules.get(&port.module_name).ok_or_else(|| {
            SpannedError::semantic(
                format!("import references undefined module '{}'", port.module_name),
                Span::default(),
            )
        })?;

        if source.exports.is_empty() {
            return Err(SpannedError::semantic(
                format!(
                    "module '{}' has no exports; import from it is rejected",
                    port.module_name
                ),
                Span::default(),
            ));
        }

        self.check_port_validity(source, &port)?;

        let snapshot = self.modules.get(module).expect("checked above").clone();
        self.modules
            .get_mut(module)
            .expect("checked above")
            .imports
            .push(port);

        if let Err(conflict) = self.check_multi_import_conflicts(module, env) {
            *self.modules.get_mut(module).expect("checked above") = snapshot;
            log::warn!("import rolled back on module '{module}': {conflict}");
            return Err(conflict);
        }

        log::debug!("module '{module}' gained an import");
        Ok(())
    }

    fn check_port_validity(&self, source: &Module, port: &PortItem) -> Result<()> {
        let checks: Vec<(ConstructType, String)> = match (port.construct_type, &port.name_scope) {
            (Some(ct), Some(NameScope::Named(names))) => {
                names.iter().map(|n| (ct, n.clone())).collect()
            }
            (Some(ct), _) => source
                .constructs
                .get(&ct)
                .map(|names| names.iter().map(|n| (ct, n.clone())).collect())
                .unwrap_or_default(),
            (None, _) => ConstructType::ALL
                .iter()
                .flat_map(|&ct| {
                    source
                        .constructs
                        .get(&ct)
                        .map(|names| names.iter().map(move |n| (ct, n.clone())).collect())
                        .unwrap_or_default()
                })
                .collect(),
        };

        for (ct, name) in checks {
            if !source.defines(ct, &name) || !source.exports(ct, &name) {
                return Err(SpannedError::semantic(
                    format!("import of {ct:?} '{name}' is not exported by its module"),
                    Span::default(),
                ));
            }
        }
        Ok(())
    }

    fn check_multi_import_conflicts(&self, module: &str, env: &Environment) -> Result<()> {
        let m = self.modules.get(module).expect("caller checked existence");
        let mut resolved: HashMap<(ConstructType, String), String> = HashMap::new();

        for ct in ConstructType::ALL {
            if let Some(names) = m.constructs.get(&ct) {
                for name in names {
                    resolved.insert((ct, name.clone()), module.to_string());
                }
            }
        }

        for port in &m.imports {
            if env.halt_requested() {
                return Err(SpannedError::new(
                    ErrorKind::Resource,
                    "compilation halted while scanning for multi-import conflicts",
                    Span::default(),
                ));
            }
            let Some(source) = self.modules.get(&port.module_name) else {
                continue;
            };
            for ct in ConstructType::ALL {
                let Some(names) = source.constructs.get(&ct) else {
                    continue;
                };
                for name in names {
                    if !port.covers(ct, name) || !source.exports(ct, name) {
                        continue;
                    }
                    if let Some(existing) = resolved.get(&(ct, name.clone())) {
                        if existing != &port.module_name {
                            return Err(SpannedError::semantic(
                                format!(
                                    "'{name}' ({ct:?}) resolves ambiguously through both '{existing}' and '{}'",
                                    port.module_name
                                ),
                                Span::default(),
                            ));
                        }
                    } else {
                        resolved.insert((ct, name.clone()), port.module_name.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves `(construct_type, name)` as seen from `module`: its own
    /// constructs take precedence, then its imports in declaration order.
    pub fn resolve(&self, module: &str, construct_type: ConstructType, name: &str) -> Option<&str> {
        let m = self.modules.get(module)?;
        if m.defines(construct_type, name) {
            return Some(module);
        }
        for port in &m.imports {
            if !port.covers(construct_type, name) {
                continue;
            }
            let Some(source) = self.modules.get(&port.module_name) else {
                continue;
            };
            if source.defines(construct_type, name) && source.exports(construct_type, name) {
                return Some(port.module_name.as_str());
            }
        }
        None
    }

    fn module_mut(&mut self, name: &str) -> Result<&mut Module> {
        self.modules
            .get_mut(name)
            .ok_or_else(|| SpannedError::semantic(format!("module '{name}' is not defined"), Span::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_own_construct_before_imports() {
        let mut table = ModuleTable::new();
        table.declare_construct(MAIN_MODULE, ConstructType::Deftemplate, "widget").unwrap();
        assert_eq!(
            table.resolve(MAIN_MODULE, ConstructType::Deftemplate, "widget"),
            Some(MAIN_MODULE)
        );
    }

    #[test]
    fn import_from_module_with_no_exports_is_rejected() {
        let mut table = ModuleTable::new();
        let env = Environment::default();
        table.define_module("OTHER").unwrap();
        table.declare_construct("OTHER", ConstructType::Deftemplate, "widget").unwrap();
        let err = table.add_import(MAIN_MODULE, PortItem::new("OTHER"), &env).unwrap_err();
        assert!(err.to_string().contains("no exports"));
    }

    #[test]
    fn import_of_unexported_construct_is_rejected() {
        let mut table = ModuleTable::new();
        let env = Environment::default();
        table.define_module("OTHER").unwrap();
        table.declare_construct("OTHER", ConstructType::Deftemplate, "widget").unwrap();
        table
            .add_export(
                "OTHER",
                PortItem::new("OTHER").with_construct(
                    ConstructType::Defrule,
                    NameScope::All,
                ),
            )
            .unwrap();
        let err = table
            .add_import(
                MAIN_MODULE,
                PortItem::new("OTHER").with_construct(ConstructType::Deftemplate, NameScope::All),
                &env,
            )
            .unwrap_err();
        assert!(err.to_string().contains("not exported"));
    }

    #[test]
    fn valid_import_resolves_through_source_module() {
        let mut table = ModuleTable::new();
        let env = Environment::default();
        table.define_module("OTHER").unwrap();
        table.declare_construct("OTHER", ConstructType::Deftemplate, "widget").unwrap();
        table
            .add_export(
                "OTHER",
                PortItem::new("OTHER").with_construct(ConstructType::Deftemplate, NameScope::All),
            )
            .unwrap();
        table
            .add_import(
                MAIN_MODULE,
                PortItem::new("OTHER").with_construct(ConstructType::Deftemplate, NameScope::All),
                &env,
            )
            .unwrap();
        assert_eq!(
            table.resolve(MAIN_MODULE, ConstructType::Deftemplate, "widget"),
            Some("OTHER")
        );
    }

    #[test]
    fn conflicting_multi_import_is_rolled_back() {
        let mut table = ModuleTable::new();
        let env = Environment::default();
        table.define_module("A").unwrap();
        table.define_module("B").unwrap();
        table.declare_construct("A", ConstructType::Deftemplate, "widget").unwrap();
        table.declare_construct("B", ConstructType::Deftemplate, "widget").unwrap();
        table
            .add_export("A", PortItem::new("A").with_construct(ConstructType::Deftemplate, NameScope::All))
            .unwrap();
        table
            .add_export("B", PortItem::new("B").with_construct(ConstructType::Deftemplate, NameScope::All))
            .unwrap();
        table.define_module("C").unwrap();
        table
            .add_import("C", PortItem::new("A").with_construct(ConstructType::Deftemplate, NameScope::All), &env)
            .unwrap();
        let err = table
            .add_import("C", PortItem::new("B").with_construct(ConstructType::Deftemplate, NameScope::All), &env)
            .unwrap_err();
        assert!(err.to_string().contains("ambiguously"));
        // rollback: C must still resolve 'widget' through A alone.
        assert_eq!(table.resolve("C", ConstructType::Deftemplate, "widget"), Some("A"));
    }

    #[test]
    fn conflicting_multi_import_halts_when_requested() {
        let mut table = ModuleTable::new();
        let mut env = Environment::default();
        table.define_module("A").unwrap();
        table.declare_construct("A", ConstructType::Deftemplate, "widget").unwrap();
        table
            .add_export("A", PortItem::new("A").with_construct(ConstructType::Deftemplate, NameScope::All))
            .unwrap();
        table.define_module("C").unwrap();
        env.request_halt();
        let err = table
            .add_import("C", PortItem::new("A").with_construct(ConstructType::Deftemplate, NameScope::All), &env)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Resource);
    }

    #[test]
    fn main_redefinition_allowed_once_before_any_ports() {
        let mut table = ModuleTable::new();
        table.define_module(MAIN_MODULE).unwrap();
        let err = table.define_module(MAIN_MODULE).unwrap_err();
        assert!(err.to_string().contains("only be redefined once"));
    }

    #[test]
    fn main_redefinition_rejected_after_ports_exist() {
        let mut table = ModuleTable::new();
        let env = Environment::default();
        table.define_module("OTHER").unwrap();
        table
            .add_export("OTHER", PortItem::new("OTHER"))
            .unwrap();
        table
            .add_import(MAIN_MODULE, PortItem::new("OTHER"), &env)
            .unwrap();
        let err = table.define_module(MAIN_MODULE).unwrap_err();
        assert!(err.to_string().contains("only be redefined once"));
    }
}
