//! Port specification grammar: `{module_name, construct_type?, construct_name?}`.

/// The construct kinds a port can name; these are the exportable/importable
/// namespaces within a module (deftemplate, defrule, and so on are all
/// "constructs" in the CLIPS sense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructType {
    Deftemplate,
    Defrule,
    Deffacts,
    Defglobal,
    Deffunction,
    Defclass,
    Defgeneric,
    DefmessageHandler,
}

impl ConstructType {
    pub const ALL: [ConstructType; 8] = [
        ConstructType::Deftemplate,
        ConstructType::Defrule,
        ConstructType::Deffacts,
        ConstructType::Defglobal,
        ConstructType::Deffunction,
        ConstructType::Defclass,
        ConstructType::Defgeneric,
        ConstructType::DefmessageHandler,
    ];
}

/// Which named constructs of a given type a port clause covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameScope {
    /// `?ALL`
    All,
    /// `?NONE`
    None,
    /// An explicit, non-empty list of construct names.
    Named(Vec<String>),
}

impl NameScope {
    pub fn covers(&self, name: &str) -> bool {
        match self {
            NameScope::All => true,
            NameScope::None => false,
            NameScope::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// One port clause: `construct_type?`/`construct_name?` being `None` means
/// "every construct type" / "every name of that type" respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortItem {
    pub module_name: String,
    pub construct_type: Option<ConstructType>,
    pub name_scope: Option<NameScope>,
}

impl PortItem {
    pub fn new(module_name: impl Into<String>) -> Self {
        PortItem {
            module_name: module_name.into(),
            construct_type: None,
            name_scope: None,
        }
    }

    pub fn with_construct(mut self, construct_type: ConstructType, name_scope: NameScope) -> Self {
        self.construct_type = Some(construct_type);
        self.name_scope = Some(name_scope);
        self
    }

    /// Whether this port clause covers `(construct_type, name)`. A port
    /// with no `construct_type` covers every type; a port with a type but
    /// no explicit name scope covers every name of that type (`?ALL`
    /// implied).
    pub fn covers(&self, construct_type: ConstructType, name: &str) -> bool {
        match self.construct_type {
            None => true,
            Some(ct) if ct != construct_type => false,
            Some(_) => match &self.name_scope {
                None => true,
                Some(scope) => scope.covers(name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_port_covers_everything() {
        let port = PortItem::new("MAIN");
        assert!(port.covers(ConstructType::Defrule, "anything"));
    }

    #[test]
    fn named_scope_only_covers_listed_names() {
        let port = PortItem::new("MAIN").with_construct(
            ConstructType::Deftemplate,
            NameScope::Named(vec!["widget".into()]),
        );
        assert!(port.covers(ConstructType::Deftemplate, "widget"));
        assert!(!port.covers(ConstructType::Deftemplate, "gadget"));
        assert!(!port.covers(ConstructType::Defrule, "widget"));
    }

    #[test]
    fn none_scope_covers_nothing() {
        let port = PortItem::new("MAIN")
            .with_construct(ConstructType::Defrule, NameScope::None);
        assert!(!port.covers(ConstructType::Defrule, "anything"));
    }
}
