//! Mapping targets: a Turtle-like triple template.
//!
//! ```text
//! :emp/{id} a :Employee ; :name {name}^^xsd:string ; :worksFor :dept/{dept} .
//! ```
//!
//! - `{col}` alone is a literal-valued column, optionally `^^datatype`
//! - `{col}` inside an IRI (`<http://ex.org/{id}>`, `:emp/{id}`) makes a URI template
//! - `a` is `rdf:type`; `;` repeats the subject, `,` repeats the predicate

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, opt, peek, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use obda_model::vocab::{RDF_TYPE, XSD_DECIMAL, XSD_INTEGER};
use obda_model::{Literal, Term, TripleAtom, Variable};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

// ============================================================================
// Raw syntax
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawTerm<'a> {
    /// `<...>`, possibly with `{col}` placeholders.
    Iri(&'a str),
    Prefixed {
        prefix: &'a str,
        local: &'a str,
    },
    Column {
        name: &'a str,
        datatype: Option<Box<RawTerm<'a>>>,
    },
    Literal {
        lexical: &'a str,
        datatype: Option<Box<RawTerm<'a>>>,
        language: Option<&'a str>,
    },
    Number(&'a str),
    RdfType,
}

type RawTriple<'a> = (RawTerm<'a>, RawTerm<'a>, RawTerm<'a>);

fn iri_ref(input: &str) -> IResult<&str, RawTerm<'_>> {
    map(
        delimited(pchar('<'), take_while(|c| c != '>'), pchar('>')),
        RawTerm::Iri,
    )(input)
}

fn is_prefix_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_local_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/' | '{' | '}' | '%' | '#' | '~' | '.')
}

fn prefixed_name(input: &str) -> IResult<&str, RawTerm<'_>> {
    let (rest, prefix) = take_while(is_prefix_char)(input)?;
    let (rest, _) = pchar(':')(rest)?;
    let (_, local) = take_while(is_local_char)(rest)?;
    // A trailing `.` ends the triple, it is not part of the name.
    let local = local.trim_end_matches('.');
    Ok((&rest[local.len()..], RawTerm::Prefixed { prefix, local }))
}

fn datatype(input: &str) -> IResult<&str, Box<RawTerm<'_>>> {
    map(preceded(tag("^^"), alt((iri_ref, prefixed_name))), Box::new)(input)
}

fn language(input: &str) -> IResult<&str, &str> {
    preceded(
        pchar('@'),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'),
    )(input)
}

fn column(input: &str) -> IResult<&str, RawTerm<'_>> {
    let (input, name) = delimited(pchar('{'), take_while1(|c| c != '}'), pchar('}'))(input)?;
    let (input, datatype) = opt(datatype)(input)?;
    Ok((
        input,
        RawTerm::Column {
            name: name.trim(),
            datatype,
        },
    ))
}

fn literal(input: &str) -> IResult<&str, RawTerm<'_>> {
    let (input, lexical) = delimited(pchar('"'), take_while(|c| c != '"'), pchar('"'))(input)?;
    let (input, datatype) = opt(datatype)(input)?;
    let (input, language) = opt(language)(input)?;
    Ok((
        input,
        RawTerm::Literal {
            lexical,
            datatype,
            language,
        },
    ))
}

fn number(input: &str) -> IResult<&str, RawTerm<'_>> {
    map(
        recognize(tuple((
            opt(pchar('-')),
            digit1,
            opt(pair(pchar('.'), digit1)),
        ))),
        RawTerm::Number,
    )(input)
}

fn term(input: &str) -> IResult<&str, RawTerm<'_>> {
    alt((iri_ref, literal, column, prefixed_name, number))(input)
}

fn verb(input: &str) -> IResult<&str, RawTerm<'_>> {
    alt((
        map(terminated(tag("a"), peek(multispace1)), |_| RawTerm::RdfType),
        term,
    ))(input)
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    delimited(multispace0, pchar(c), multispace0)
}

fn triples(input: &str) -> IResult<&str, Vec<RawTriple<'_>>> {
    type Objects<'a> = Vec<RawTerm<'a>>;

    fn object_list(input: &str) -> IResult<&str, Objects<'_>> {
        separated_list1(symbol(','), term)(input)
    }

    fn predicate_objects(input: &str) -> IResult<&str, Vec<(RawTerm<'_>, Objects<'_>)>> {
        separated_list1(
            symbol(';'),
            tuple((verb, preceded(multispace1, object_list))),
        )(input)
    }

    fn subject_block(
        input: &str,
    ) -> IResult<&str, (RawTerm<'_>, Vec<(RawTerm<'_>, Objects<'_>)>)> {
        tuple((term, preceded(multispace1, predicate_objects)))(input)
    }

    let (input, _) = multispace0(input)?;
    let (input, blocks) = separated_list1(symbol('.'), subject_block)(input)?;
    let (input, _) = opt(symbol(';'))(input)?;
    let (input, _) = opt(symbol('.'))(input)?;
    let (input, _) = multispace0(input)?;

    let mut out = Vec::new();
    for (subject, pairs) in blocks {
        for (predicate, objects) in pairs {
            for object in objects {
                out.push((subject.clone(), predicate.clone(), object));
            }
        }
    }
    Ok((input, out))
}

// ============================================================================
// Resolution
// ============================================================================

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern"))
}

/// `http://ex.org/{dept}/{id}` → template `http://ex.org/{}/{}` over `dept`, `id`.
pub fn iri_or_template(iri: &str) -> Term {
    let re = placeholder();
    if !re.is_match(iri) {
        return Term::iri(iri);
    }
    let args = re
        .captures_iter(iri)
        .filter_map(|c| c.get(1))
        .map(|m| Term::var(m.as_str().trim()))
        .collect();
    Term::uri_template(re.replace_all(iri, "{}").into_owned(), args)
}

struct Resolver<'p> {
    prefixes: &'p BTreeMap<String, String>,
}

impl Resolver<'_> {
    fn expand(&self, raw: &RawTerm<'_>) -> Result<String, String> {
        match raw {
            RawTerm::Iri(iri) => Ok((*iri).to_string()),
            RawTerm::Prefixed { prefix, local } => self
                .prefixes
                .get(*prefix)
                .map(|ns| format!("{ns}{local}"))
                .ok_or_else(|| format!("undeclared prefix `{prefix}:`")),
            RawTerm::RdfType => Ok(RDF_TYPE.to_string()),
            other => Err(format!("expected an IRI, found {other:?}")),
        }
    }

    fn resolve(&self, raw: &RawTerm<'_>) -> Result<Term, String> {
        match raw {
            RawTerm::Iri(_) | RawTerm::Prefixed { .. } | RawTerm::RdfType => {
                Ok(iri_or_template(&self.expand(raw)?))
            }
            RawTerm::Column { name, datatype } => Ok(Term::Variable(match datatype {
                Some(dt) => Variable::typed(*name, self.expand(dt)?),
                None => Variable::new(*name),
            })),
            RawTerm::Literal {
                lexical,
                datatype,
                language,
            } => Ok(Term::Literal(match (datatype, language) {
                (Some(dt), _) => Literal::typed(*lexical, self.expand(dt)?),
                (None, Some(lang)) => Literal::lang(*lexical, *lang),
                (None, None) => Literal::plain(*lexical),
            })),
            RawTerm::Number(n) if n.contains('.') => Ok(Term::typed_literal(*n, XSD_DECIMAL)),
            RawTerm::Number(n) => Ok(Term::typed_literal(*n, XSD_INTEGER)),
        }
    }
}

/// Parse a target into triple atoms, expanding prefixed names.
pub fn parse_target(
    text: &str,
    prefixes: &BTreeMap<String, String>,
) -> Result<Vec<TripleAtom>, String> {
    let (_, raw) = all_consuming(triples)(text.trim()).map_err(|e| {
        format!("target expects `subject predicate object [; predicate object] .`: {e}")
    })?;
    let resolver = Resolver { prefixes };
    raw.iter()
        .map(|(s, p, o)| {
            Ok(TripleAtom::new(
                resolver.resolve(s)?,
                resolver.resolve(p)?,
                resolver.resolve(o)?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use obda_model::vocab::XSD_STRING;

    fn prefixes() -> BTreeMap<String, String> {
        [
            ("", "http://ex.org/"),
            ("xsd", "http://www.w3.org/2001/XMLSchema#"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn class_and_properties_share_a_subject() {
        let atoms = parse_target(
            ":emp/{id} a :Employee ; :name {name}^^xsd:string ; :worksFor <http://ex.org/dept/{dept}> .",
            &prefixes(),
        )
        .unwrap();
        assert_eq!(atoms.len(), 3);

        let subject = Term::uri_template("http://ex.org/emp/{}", vec![Term::var("id")]);
        assert_eq!(
            atoms[0],
            TripleAtom::new(
                subject.clone(),
                Term::iri(RDF_TYPE),
                Term::iri("http://ex.org/Employee")
            )
        );
        let Term::Variable(name) = &atoms[1].object else {
            panic!("expected a column");
        };
        assert_eq!(name.datatype.as_deref(), Some(XSD_STRING));
        assert_eq!(
            atoms[2].object,
            Term::uri_template("http://ex.org/dept/{}", vec![Term::var("dept")])
        );
    }

    #[test]
    fn object_lists_and_literals() {
        let atoms = parse_target(
            r#":p/{a}/{b} :tag "x"@en, "y"^^xsd:string, 42"#,
            &prefixes(),
        )
        .unwrap();
        assert_eq!(atoms.len(), 3);
        assert_eq!(
            atoms[0].subject.as_function().unwrap().args,
            vec![Term::var("a"), Term::var("b")]
        );
        assert_eq!(atoms[2].object, Term::typed_literal("42", XSD_INTEGER));
    }

    #[test]
    fn undeclared_prefixes_and_garbage_fail() {
        assert!(parse_target("foo:x a :C .", &prefixes())
            .unwrap_err()
            .contains("undeclared prefix"));
        assert!(parse_target(":x a", &prefixes()).is_err());
    }
}
