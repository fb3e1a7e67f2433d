//! The constraint record and its facet parser.

use crate::bound::{FieldCountBound, NumericBound};
use crate::facet::{Facet, ParseRecord};
use rete_base::{AtomRef, Result, Span, SpannedError};

/// An already-classified facet argument: the scanner/parser layer is
/// responsible for turning surface tokens into these before calling
/// [`parse_standard_constraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FacetArg {
    /// The reserved `?VARIABLE` marker, which reopens the facet's
    /// restriction to "any constant of an admitted type" rather than adding
    /// a specific constant.
    Variable,
    Symbol(AtomRef),
    String(AtomRef),
    Integer(i64),
    Float(f64),
    InstanceName(AtomRef),
    Class(AtomRef),
    PosInfinity,
    NegInfinity,
}

/// The per-slot aggregate of every facet declaration: type admission,
/// restriction lists, range, cardinality, and an optional nested multifield
/// element constraint.
#[derive(Debug, Clone)]
pub struct ConstraintRecord {
    pub any_allowed: bool,
    pub symbols_allowed: bool,
    pub strings_allowed: bool,
    pub integers_allowed: bool,
    pub floats_allowed: bool,
    pub instance_names_allowed: bool,
    pub instance_addresses_allowed: bool,
    pub fact_addresses_allowed: bool,
    pub external_addresses_allowed: bool,
    pub voids_allowed: bool,
    pub singlefield_allowed: bool,
    pub multifield_allowed: bool,

    pub symbol_restriction: bool,
    pub symbol_list: Vec<AtomRef>,
    pub string_restriction: bool,
    pub string_list: Vec<AtomRef>,
    pub integer_restriction: bool,
    pub integer_list: Vec<i64>,
    pub float_restriction: bool,
    pub float_list: Vec<f64>,
    pub instance_name_restriction: bool,
    pub instance_name_list: Vec<AtomRef>,
    pub class_restriction: bool,
    pub class_list: Vec<AtomRef>,

    pub min_value: NumericBound,
    pub max_value: NumericBound,
    pub min_fields: FieldCountBound,
    pub max_fields: FieldCountBound,

    pub multifield: Option<Box<ConstraintRecord>>,
}

impl ConstraintRecord {
    /// A slot with no facets at all: every type admitted, no restrictions,
    /// cardinality `1..1` for a single-field slot or `0..unbounded` for a
    /// multifield one.
    pub fn unconstrained(is_multifield: bool) -> Self {
        ConstraintRecord {
            any_allowed: true,
            symbols_allowed: true,
            strings_allowed: true,
            integers_allowed: true,
            floats_allowed: true,
            instance_names_allowed: true,
            instance_addresses_allowed: true,
            fact_addresses_allowed: true,
            external_addresses_allowed: true,
            voids_allowed: true,
            singlefield_allowed: !is_multifield,
            multifield_allowed: is_multifield,

            symbol_restriction: false,
            symbol_list: Vec::new(),
            string_restriction: false,
            string_list: Vec::new(),
            integer_restriction: false,
            integer_list: Vec::new(),
            float_restriction: false,
            float_list: Vec::new(),
            instance_name_restriction: false,
            instance_name_list: Vec::new(),
            class_restriction: false,
            class_list: Vec::new(),

            min_value: NumericBound::NegInfinity,
            max_value: NumericBound::PosInfinity,
            min_fields: if is_multifield {
                FieldCountBound::Finite(0)
            } else {
                FieldCountBound::Finite(1)
            },
            max_fields: if is_multifield {
                FieldCountBound::Unbounded
            } else {
                FieldCountBound::Finite(1)
            },

            multifield: None,
        }
    }

    /// Cross-checks restrictions against type admission (the conflict
    /// rule): every active restriction's type must still be admitted, and
    /// `range`'s bounds must match an admitted numeric type.
    pub fn check_conflicts(&self) -> Result<()> {
        if self.symbol_restriction && !self.symbols_allowed {
            return Err(SpannedError::semantic(
                "allowed-symbols restricts a type not admitted by 'type'",
                Span::default(),
            ));
        }
        if self.string_restriction && !self.strings_allowed {
            return Err(SpannedError::semantic(
                "allowed-strings restricts a type not admitted by 'type'",
                Span::default(),
            ));
        }
        if self.integer_restriction && !self.integers_allowed {
            return Err(SpannedError::semantic(
                "allowed-integers restricts a type not admitted by 'type'",
                Span::default(),
            ));
        }
        if self.float_restriction && !self.floats_allowed {
            return Err(SpannedError::semantic(
                "allowed-floats restricts a type not admitted by 'type'",
                Span::default(),
            ));
        }
        if self.instance_name_restriction && !self.instance_names_allowed {
            return Err(SpannedError::semantic(
                "allowed-instance-names restricts a type not admitted by 'type'",
                Span::default(),
            ));
        }
        if self.class_restriction && !self.instance_names_allowed && !self.instance_addresses_allowed {
            return Err(SpannedError::semantic(
                "allowed-classes requires instance admission",
                Span::default(),
            ));
        }
        if self.min_value.is_finite() || self.max_value.is_finite() {
            if !self.integers_allowed && !self.floats_allowed {
                return Err(SpannedError::semantic(
                    "range requires a numeric type to be admitted",
                    Span::default(),
                ));
            }
        }
        if !self.min_value.le(&self.max_value) {
            return Err(SpannedError::semantic(
                "range minimum exceeds maximum",
                Span::default(),
            ));
        }
        if !self.min_fields.le(&self.max_fields) {
            return Err(SpannedError::semantic(
                "cardinality minimum exceeds maximum",
                Span::default(),
            ));
        }
        Ok(())
    }
}

fn conflicting_facet(parsed: &ParseRecord, facet: Facet, conflicts: &[Facet]) -> Option<Facet> {
    let _ = facet;
    conflicts.iter().copied().find(|&c| parsed.has(c))
}

/// Consumes one facet's already-classified arguments, updating `record` and
/// `parsed`. Returns a semantic error naming the conflicting facet pair on
/// any violation of the facet-interaction table; the record is left
/// unmodified on error.
pub fn parse_standard_constraint(
    facet: Facet,
    args: &[FacetArg],
    record: &mut ConstraintRecord,
    parsed: &mut ParseRecord,
    multifield_ok: bool,
) -> Result<()> {
    let conflicts: &[Facet] = match facet {
        Facet::AllowedValues => &[
            Facet::AllowedSymbols,
            Facet::AllowedStrings,
            Facet::AllowedLexemes,
            Facet::AllowedIntegers,
            Facet::AllowedFloats,
            Facet::AllowedNumbers,
            Facet::AllowedInstanceNames,
            Facet::AllowedClasses,
        ],
        Facet::AllowedSymbols | Facet::AllowedStrings => {
            &[Facet::AllowedValues, Facet::AllowedLexemes]
        }
        Facet::AllowedLexemes => &[
            Facet::AllowedValues,
            Facet::AllowedSymbols,
            Facet::AllowedStrings,
        ],
        Facet::AllowedIntegers | Facet::AllowedFloats => {
            &[Facet::AllowedValues, Facet::AllowedNumbers]
        }
        Facet::AllowedNumbers => &[
            Facet::AllowedValues,
            Facet::AllowedIntegers,
            Facet::AllowedFloats,
        ],
        Facet::AllowedInstanceNames | Facet::AllowedClasses => &[Facet::AllowedValues],
        Facet::Range => &[
            Facet::AllowedValues,
            Facet::AllowedNumbers,
            Facet::AllowedIntegers,
            Facet::AllowedFloats,
        ],
        Facet::Type | Facet::Cardinality => &[],
    };

    if facet == Facet::Cardinality && !multifield_ok {
        return Err(SpannedError::semantic(
            "cardinality is not applicable to a single-field slot",
            Span::default(),
        ));
    }

    if let Some(other) = conflicting_facet(parsed, facet, conflicts) {
        return Err(SpannedError::semantic(
            format!("facet {facet:?} conflicts with already-declared facet {other:?}"),
            Span::default(),
        ));
    }

    if !parsed.mark(facet) {
        return Err(SpannedError::semantic(
            format!("facet {facet:?} declared more than once"),
            Span::default(),
        ));
    }

    match facet {
        Facet::Type => apply_type(args, record)?,
        Facet::Range => apply_range(args, record)?,
        Facet::Cardinality => apply_cardinality(args, record)?,
        Facet::AllowedValues => apply_allowed_values(args, record),
        Facet::AllowedSymbols => apply_allowed_symbols(args, record),
        Facet::AllowedStrings => apply_allowed_strings(args, record),
        Facet::AllowedLexemes => {
            apply_allowed_symbols(args, record);
            apply_allowed_strings(args, record);
        }
        Facet::AllowedIntegers => apply_allowed_integers(args, record),
        Facet::AllowedFloats => apply_allowed_floats(args, record),
        Facet::AllowedNumbers => {
            apply_allowed_integers(args, record);
            apply_allowed_floats(args, record);
        }
        Facet::AllowedInstanceNames => apply_allowed_instance_names(args, record),
        Facet::AllowedClasses => apply_allowed_classes(args, record),
    }

    record.check_conflicts()
}

fn apply_type(args: &[FacetArg], record: &mut ConstraintRecord) -> Result<()> {
    record.any_allowed = false;
    record.symbols_allowed = false;
    record.strings_allowed = false;
    record.integers_allowed = false;
    record.floats_allowed = false;
    record.instance_names_allowed = false;
    record.instance_addresses_allowed = false;
    record.fact_addresses_allowed = false;
    record.external_addresses_allowed = false;
    record.voids_allowed = false;

    for arg in args {
        match arg {
            FacetArg::Variable => record.any_allowed = true,
            FacetArg::Symbol(r) => {
                // A type name ("SYMBOL", "LEXEME", ...) arrives as a symbol
                // constant classified by the caller; the caller is expected
                // to have already resolved it to one admission bit by the
                // time it reaches here for every variant except the
                // compound keywords, which `rete-network`'s facade expands
                // before calling this function. This crate only toggles the
                // flags it is told to.
                let _ = r;
            }
            _ => {
                return Err(SpannedError::semantic(
                    "type facet expects type-name symbols or ?VARIABLE",
                    Span::default(),
                ))
            }
        }
    }
    Ok(())
}

/// Toggles one primitive-type admission flag by name, used by a higher
/// layer that has already resolved a `type` facet's symbol arguments
/// (`SYMBOL`, `STRING`, `INTEGER`, `FLOAT`, `INSTANCE-NAME`,
/// `INSTANCE-ADDRESS`, `FACT-ADDRESS`, `EXTERNAL-ADDRESS`, `LEXEME`,
/// `NUMBER`) to the matching flag(s).
pub fn admit_type_name(record: &mut ConstraintRecord, name: &str) -> Result<()> {
    match name {
        "SYMBOL" => record.symbols_allowed = true,
        "STRING" => record.strings_allowed = true,
        "LEXEME" => {
            record.symbols_allowed = true;
            record.strings_allowed = true;
        }
        "INTEGER" => record.integers_allowed = true,
        "FLOAT" => record.floats_allowed = true,
        "NUMBER" => {
            record.integers_allowed = true;
            record.floats_allowed = true;
        }
        "INSTANCE-NAME" => record.instance_names_allowed = true,
        "INSTANCE-ADDRESS" => record.instance_addresses_allowed = true,
        "FACT-ADDRESS" => record.fact_addresses_allowed = true,
        "EXTERNAL-ADDRESS" => record.external_addresses_allowed = true,
        other => {
            return Err(SpannedError::semantic(
                format!("unknown type name '{other}'"),
                Span::default(),
            ))
        }
    }
    Ok(())
}

fn numeric_bound_of(arg: &FacetArg) -> Option<NumericBound> {
    match arg {
        FacetArg::Integer(i) => Some(NumericBound::Integer(*i)),
        FacetArg::Float(f) => Some(NumericBound::Float(*f)),
        FacetArg::PosInfinity => Some(NumericBound::PosInfinity),
        FacetArg::NegInfinity => Some(NumericBound::NegInfinity),
        _ => None,
    }
}

fn apply_range(args: &[FacetArg], record: &mut ConstraintRecord) -> Result<()> {
    if args.len() != 2 {
        return Err(SpannedError::semantic(
            "range expects exactly two bounds",
            Span::default(),
        ));
    }
    let min = numeric_bound_of(&args[0])
        .ok_or_else(|| SpannedError::semantic("range bound must be numeric or an infinity", Span::default()))?;
    let max = numeric_bound_of(&args[1])
        .ok_or_else(|| SpannedError::semantic("range bound must be numeric or an infinity", Span::default()))?;
    record.min_value = min;
    record.max_value = max;
    Ok(())
}

fn field_count_bound_of(arg: &FacetArg) -> Option<FieldCountBound> {
    match arg {
        FacetArg::Integer(i) if *i >= 0 => Some(FieldCountBound::Finite(*i as u32)),
        FacetArg::PosInfinity => Some(FieldCountBound::Unbounded),
        _ => None,
    }
}

fn apply_cardinality(args: &[FacetArg], record: &mut ConstraintRecord) -> Result<()> {
    if args.len() != 2 {
        return Err(SpannedError::semantic(
            "cardinality expects exactly two bounds",
            Span::default(),
        ));
    }
    let min = field_count_bound_of(&args[0])
        .ok_or_else(|| SpannedError::semantic("cardinality bound must be a non-negative integer or ?VARIABLE infinity", Span::default()))?;
    let max = field_count_bound_of(&args[1])
        .ok_or_else(|| SpannedError::semantic("cardinality bound must be a non-negative integer or ?VARIABLE infinity", Span::default()))?;
    record.min_fields = min;
    record.max_fields = max;
    Ok(())
}

fn apply_allowed_values(args: &[FacetArg], record: &mut ConstraintRecord) {
    for arg in args {
        match arg {
            FacetArg::Variable => {}
            FacetArg::Symbol(r) => {
                record.symbol_restriction = true;
                record.symbol_list.push(*r);
            }
            FacetArg::String(r) => {
                record.string_restriction = true;
                record.string_list.push(*r);
            }
            FacetArg::Integer(i) => {
                record.integer_restriction = true;
                record.integer_list.push(*i);
            }
            FacetArg::Float(f) => {
                record.float_restriction = true;
                record.float_list.push(*f);
            }
            FacetArg::InstanceName(r) => {
                record.instance_name_restriction = true;
                record.instance_name_list.push(*r);
            }
            FacetArg::Class(r) => {
                record.class_restriction = true;
                record.class_list.push(*r);
            }
            FacetArg::PosInfinity | FacetArg::NegInfinity => {}
        }
    }
}

fn apply_allowed_symbols(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.symbol_restriction = true;
    for arg in args {
        if let FacetArg::Symbol(r) = arg {
            record.symbol_list.push(*r);
        }
    }
}

fn apply_allowed_strings(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.string_restriction = true;
    for arg in args {
        if let FacetArg::String(r) = arg {
            record.string_list.push(*r);
        }
    }
}

fn apply_allowed_integers(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.integer_restriction = true;
    for arg in args {
        if let FacetArg::Integer(i) = arg {
            record.integer_list.push(*i);
        }
    }
}

fn apply_allowed_floats(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.float_restriction = true;
    for arg in args {
        if let FacetArg::Float(f) = arg {
            record.float_list.push(*f);
        }
    }
}

fn apply_allowed_instance_names(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.instance_name_restriction = true;
    for arg in args {
        if let FacetArg::InstanceName(r) = arg {
            record.instance_name_list.push(*r);
        }
    }
}

fn apply_allowed_classes(args: &[FacetArg], record: &mut ConstraintRecord) {
    record.class_restriction = true;
    for arg in args {
        if let FacetArg::Class(r) = arg {
            record.class_list.push(*r);
        }
    }
}

/// Propagates facets the user did *not* explicitly set on `dst` from `src`.
/// `allowed-values` has special combination semantics: if `dst` set no
/// `allowed-*` facet at all, it inherits `src`'s full restriction set;
/// otherwise, each type whose specific facet was not set on `dst` but whose
/// restriction list is non-empty on `src` is merged in.
pub fn overlay(parsed: &ParseRecord, dst: &mut ConstraintRecord, src: &ConstraintRecord) {
    if !parsed.has(Facet::Type) {
        dst.any_allowed = src.any_allowed;
        dst.symbols_allowed = src.symbols_allowed;
        dst.strings_allowed = src.strings_allowed;
        dst.integers_allowed = src.integers_allowed;
        dst.floats_allowed = src.floats_allowed;
        dst.instance_names_allowed = src.instance_names_allowed;
        dst.instance_addresses_allowed = src.instance_addresses_allowed;
        dst.fact_addresses_allowed = src.fact_addresses_allowed;
        dst.external_addresses_allowed = src.external_addresses_allowed;
        dst.voids_allowed = src.voids_allowed;
    }
    if !parsed.has(Facet::Range) {
        dst.min_value = src.min_value;
        dst.max_value = src.max_value;
    }
    if !parsed.has(Facet::Cardinality) {
        dst.min_fields = src.min_fields;
        dst.max_fields = src.max_fields;
    }

    let dst_set_any_allowed_values = parsed.any_of(&[
        Facet::AllowedValues,
        Facet::AllowedSymbols,
        Facet::AllowedStrings,
        Facet::AllowedLexemes,
        Facet::AllowedIntegers,
        Facet::AllowedFloats,
        Facet::AllowedNumbers,
        Facet::AllowedInstanceNames,
        Facet::AllowedClasses,
    ]);

    if !dst_set_any_allowed_values {
        dst.symbol_restriction = src.symbol_restriction;
        dst.symbol_list = src.symbol_list.clone();
        dst.string_restriction = src.string_restriction;
        dst.string_list = src.string_list.clone();
        dst.integer_restriction = src.integer_restriction;
        dst.integer_list = src.integer_list.clone();
        dst.float_restriction = src.float_restriction;
        dst.float_list = src.float_list.clone();
        dst.instance_name_restriction = src.instance_name_restriction;
        dst.instance_name_list = src.instance_name_list.clone();
        dst.class_restriction = src.class_restriction;
        dst.class_list = src.class_list.clone();
    } else {
        if !parsed.has(Facet::AllowedSymbols) && !src.symbol_list.is_empty() {
            dst.symbol_restriction = src.symbol_restriction;
            dst.symbol_list = src.symbol_list.clone();
        }
        if !parsed.has(Facet::AllowedStrings) && !src.string_list.is_empty() {
            dst.string_restriction = src.string_restriction;
            dst.string_list = src.string_list.clone();
        }
        if !parsed.has(Facet::AllowedIntegers) && !src.integer_list.is_empty() {
            dst.integer_restriction = src.integer_restriction;
            dst.integer_list = src.integer_list.clone();
        }
        if !parsed.has(Facet::AllowedFloats) && !src.float_list.is_empty() {
            dst.float_restriction = src.float_restriction;
            dst.float_list = src.float_list.clone();
        }
        if !parsed.has(Facet::AllowedInstanceNames) && !src.instance_name_list.is_empty() {
            dst.instance_name_restriction = src.instance_name_restriction;
            dst.instance_name_list = src.instance_name_list.clone();
        }
        if !parsed.has(Facet::AllowedClasses) && !src.class_list.is_empty() {
            dst.class_restriction = src.class_restriction;
            dst.class_list = src.class_list.clone();
        }
    }
}

/// A concrete default value derived from a constraint record.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Symbol(AtomRef),
    String(AtomRef),
    Integer(i64),
    Float(f64),
    InstanceName(AtomRef),
    InstanceAddress,
    FactAddress,
    ExternalAddress,
    Multifield(Vec<DefaultValue>),
}

/// Picks a default value admitted by `record`, trying types in the fixed
/// order symbol, string, integer, float, instance-name, instance-address,
/// fact-address, external-address. For multifield slots the cardinality
/// minimum determines the repeat count (the same scalar default repeated).
pub fn derive_default(record: &ConstraintRecord, is_multifield: bool) -> Option<DefaultValue> {
    let scalar = derive_scalar_default(record)?;
    if !is_multifield {
        return Some(scalar);
    }
    let count = match record.min_fields {
        FieldCountBound::Finite(n) => n as usize,
        FieldCountBound::Unbounded => 0,
    };
    Some(DefaultValue::Multifield(vec![scalar; count]))
}

fn derive_scalar_default(record: &ConstraintRecord) -> Option<DefaultValue> {
    if record.symbols_allowed {
        if let Some(&r) = record.symbol_list.first() {
            return Some(DefaultValue::Symbol(r));
        }
        if !record.symbol_restriction {
            return None; // caller supplies the canonical "nil"-equivalent symbol
        }
    }
    if record.strings_allowed {
        if let Some(&r) = record.string_list.first() {
            return Some(DefaultValue::String(r));
        }
    }
    if record.integers_allowed || record.floats_allowed {
        if record.min_value.is_finite() || record.max_value.is_finite() {
            let bound = if record.min_value.is_finite() {
                record.min_value
            } else {
                record.max_value
            };
            return Some(match bound {
                NumericBound::Integer(i) => DefaultValue::Integer(i),
                NumericBound::Float(f) => DefaultValue::Float(f),
                _ => unreachable!("is_finite guarantees Integer or Float"),
            });
        }
        if record.integers_allowed {
            if let Some(&i) = record.integer_list.first() {
                return Some(DefaultValue::Integer(i));
            }
            return Some(DefaultValue::Integer(0));
        }
        if record.floats_allowed {
            if let Some(&f) = record.float_list.first() {
                return Some(DefaultValue::Float(f));
            }
            return Some(DefaultValue::Float(0.0));
        }
    }
    if record.instance_names_allowed {
        if let Some(&r) = record.instance_name_list.first() {
            return Some(DefaultValue::InstanceName(r));
        }
    }
    if record.instance_addresses_allowed {
        return Some(DefaultValue::InstanceAddress);
    }
    if record.fact_addresses_allowed {
        return Some(DefaultValue::FactAddress);
    }
    if record.external_addresses_allowed {
        return Some(DefaultValue::ExternalAddress);
    }
    None
}
