//! Terms: the leaves and inner nodes of every atom.

use crate::template;
use crate::vocab;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Variables and constants
// ============================================================================

/// A variable. Identity is the name; the datatype is an annotation carried
/// from mapping targets such as `{salary}^^xsd:decimal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: None,
        }
    }

    pub fn typed(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: Some(datatype.into()),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Literal {
    /// `xsd:string` literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, vocab::XSD_STRING)
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: vocab::RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IriRef {
    pub value: String,
}

impl IriRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

// ============================================================================
// Function terms
// ============================================================================

/// Boolean and comparison operators usable in mapping filters and query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And,
    Or,
    Not,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    IsNull,
    IsNotNull,
    Like,
}

impl Operator {
    pub fn arity(self) -> usize {
        match self {
            Operator::Not | Operator::IsNull | Operator::IsNotNull => 1,
            _ => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Eq => "EQ",
            Operator::Neq => "NEQ",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
            Operator::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionSymbol {
    /// IRI constructor; `{}` placeholders are filled positionally by the arguments.
    UriTemplate { template: String },
    Operator { op: Operator },
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        return_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Function {
    pub symbol: FunctionSymbol,
    pub args: Vec<Term>,
}

impl Function {
    pub fn new(symbol: FunctionSymbol, args: Vec<Term>) -> Self {
        Self { symbol, args }
    }

    pub fn uri_template(template: impl Into<String>, args: Vec<Term>) -> Self {
        Self::new(
            FunctionSymbol::UriTemplate {
                template: template.into(),
            },
            args,
        )
    }

    pub fn operator(op: Operator, args: Vec<Term>) -> Self {
        Self::new(FunctionSymbol::Operator { op }, args)
    }

    pub fn name(&self) -> &str {
        match &self.symbol {
            FunctionSymbol::UriTemplate { .. } => "URI_TEMPLATE",
            FunctionSymbol::Operator { op } => op.symbol(),
            FunctionSymbol::Named { name, .. } => name,
        }
    }

    /// Datatype IRI the function evaluates to, when known.
    pub fn return_type(&self) -> Option<&str> {
        match &self.symbol {
            FunctionSymbol::UriTemplate { .. } => None,
            FunctionSymbol::Operator { .. } => Some(vocab::XSD_BOOLEAN),
            FunctionSymbol::Named { return_type, .. } => return_type.as_deref(),
        }
    }

    pub fn template(&self) -> Option<&str> {
        match &self.symbol {
            FunctionSymbol::UriTemplate { template } => Some(template),
            _ => None,
        }
    }

    pub fn is_uri_template(&self) -> bool {
        self.template().is_some()
    }
}

// ============================================================================
// Term
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Term {
    Variable(Variable),
    Literal(Literal),
    Iri(IriRef),
    Function(Function),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(Variable::new(name))
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(IriRef::new(value))
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(lexical))
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::typed(lexical, datatype))
    }

    pub fn uri_template(template: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Function(Function::uri_template(template, args))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(&iri.value),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Term::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// No variable occurs anywhere in the term.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Literal(_) | Term::Iri(_) => true,
            Term::Function(f) => f.args.iter().all(Term::is_ground),
        }
    }

    /// The term denotes an IRI once evaluated (constant IRI or URI template).
    pub fn is_iri_valued(&self) -> bool {
        match self {
            Term::Iri(_) => true,
            Term::Function(f) => f.is_uri_template(),
            _ => false,
        }
    }

    pub fn occurs(&self, variable: &Variable) -> bool {
        match self {
            Term::Variable(v) => v == variable,
            Term::Literal(_) | Term::Iri(_) => false,
            Term::Function(f) => f.args.iter().any(|a| a.occurs(variable)),
        }
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<Variable>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Literal(_) | Term::Iri(_) => {}
            Term::Function(f) => {
                for arg in &f.args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    /// Lexical value of a constant term: the IRI string or the literal form.
    pub fn lexical_value(&self) -> Option<String> {
        match self {
            Term::Iri(iri) => Some(iri.value.clone()),
            Term::Literal(lit) => Some(lit.lexical.clone()),
            Term::Function(f) => {
                let template = f.template()?;
                let values = f
                    .args
                    .iter()
                    .map(Term::lexical_value)
                    .collect::<Option<Vec<_>>>()?;
                template::instantiate(template, &values)
            }
            Term::Variable(_) => None,
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Variable(v)
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Term::Literal(l)
    }
}

impl From<IriRef> for Term {
    fn from(i: IriRef) -> Self {
        Term::Iri(i)
    }
}

impl From<Function> for Term {
    fn from(f: Function) -> Self {
        Term::Function(f)
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = self.lexical.replace('\\', "\\\\").replace('"', "\\\"");
        match &self.language {
            Some(lang) => write!(f, "\"{escaped}\"@{lang}"),
            None if self.datatype == vocab::XSD_STRING => write!(f, "\"{escaped}\""),
            None => write!(f, "\"{escaped}\"^^<{}>", self.datatype),
        }
    }
}

impl fmt::Display for IriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.value)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            FunctionSymbol::UriTemplate { template } => write!(f, "<{template}>(")?,
            _ => write!(f, "{}(", self.name())?,
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => v.fmt(f),
            Term::Literal(l) => l.fmt(f),
            Term::Iri(i) => i.fmt(f),
            Term::Function(func) => func.fmt(f),
        }
    }
}
