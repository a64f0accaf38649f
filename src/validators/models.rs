//! Content model matching
//!
//! Child sequences are matched with partial derivatives: a state is a stack
//! of frames saying which particle is being iterated and how many
//! iterations it has completed. Feeding a child name replaces every state by
//! the states reachable after consuming it, so occurrence bounds are counted
//! rather than unrolled and `maxOccurs="990"` costs no more than `1`.
//!
//! A frame marked `fresh` was pushed while looking for the next child. When
//! it is reached again before anything was consumed, its iteration matched
//! nothing, and repeating it cannot help; that keeps the search finite for
//! nullable groups under `unbounded`.

use std::ptr;

use crate::namespaces::QName;

use super::base::ComponentLookup;
use super::elements::ElementDecl;
use super::particles::{Particle, Term};
use super::wildcards::{NamespaceConstraint, Wildcard};

/// Bit width of the `xs:all` bookkeeping; members beyond it are ignored
const MAX_ALL_MEMBERS: usize = 64;

/// Declaration a child element was matched against
#[derive(Debug, Clone, Copy)]
pub enum Matched<'a> {
    /// Element declaration, local or global
    Element(&'a ElementDecl),
    /// Wildcard
    Wildcard(&'a Wildcard),
}

#[derive(Debug, Clone, Copy)]
enum Frame<'a> {
    /// Between iterations of `particle`, `done` of them complete
    Iter {
        particle: &'a Particle,
        done: u32,
        fresh: bool,
    },
    /// An `xs:all` member that must be matched now
    Start { particle: &'a Particle },
    /// Remaining members of a sequence
    Seq { items: &'a [Particle], next: usize },
    /// Members of an `xs:all` not used yet
    All { items: &'a [Particle], used: u64 },
}

impl PartialEq for Frame<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Frame::Iter { particle: a, done: x, fresh: f },
                Frame::Iter { particle: b, done: y, fresh: g },
            ) => ptr::eq(*a, *b) && x == y && f == g,
            (Frame::Start { particle: a }, Frame::Start { particle: b }) => ptr::eq(*a, *b),
            (Frame::Seq { items: a, next: x }, Frame::Seq { items: b, next: y }) => {
                ptr::eq(a.as_ptr(), b.as_ptr()) && x == y
            }
            (Frame::All { items: a, used: x }, Frame::All { items: b, used: y }) => {
                ptr::eq(a.as_ptr(), b.as_ptr()) && x == y
            }
            _ => false,
        }
    }
}

type Stack<'a> = Vec<Frame<'a>>;

enum Step<'a> {
    /// A leaf term that could match the next child, with the state after it
    Leaf(&'a Term, Stack<'a>),
    /// The content may end here
    End,
}

/// Incremental matcher for the children of one element
pub struct ContentMatcher<'a> {
    lookup: &'a dyn ComponentLookup,
    states: Vec<Stack<'a>>,
}

impl<'a> ContentMatcher<'a> {
    /// Start matching against `particle`
    pub fn new(particle: &'a Particle, lookup: &'a dyn ComponentLookup) -> Self {
        Self {
            lookup,
            states: vec![vec![Frame::Iter {
                particle,
                done: 0,
                fresh: false,
            }]],
        }
    }

    /// Feed the next child element
    ///
    /// On failure the names that would have been accepted are returned and
    /// the matcher is left unchanged.
    pub fn push(&mut self, name: &QName) -> Result<Matched<'a>, Vec<String>> {
        let lookup = self.lookup;
        let mut next_states: Vec<Stack<'a>> = Vec::new();
        let mut matched = None;

        for state in &self.states {
            walk(state.clone(), &mut |step| {
                if let Step::Leaf(term, mut continuation) = step {
                    if let Some(m) = match_term(term, name, lookup) {
                        matched.get_or_insert(m);
                        settle(&mut continuation);
                        if !next_states.contains(&continuation) {
                            next_states.push(continuation);
                        }
                    }
                }
            });
        }

        match matched {
            Some(m) => {
                self.states = next_states;
                Ok(m)
            }
            None => Err(self.expected()),
        }
    }

    /// Check that the content may end here
    pub fn finish(&self) -> Result<(), Vec<String>> {
        let mut complete = false;
        for state in &self.states {
            walk(state.clone(), &mut |step| {
                if matches!(step, Step::End) {
                    complete = true;
                }
            });
            if complete {
                return Ok(());
            }
        }
        Err(self.expected())
    }

    /// Names acceptable as the next child, in model order
    pub fn expected(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for state in &self.states {
            walk(state.clone(), &mut |step| {
                if let Step::Leaf(term, _) = step {
                    let label = term_label(term);
                    if !names.contains(&label) {
                        names.push(label);
                    }
                }
            });
        }
        names
    }
}

/// libxml2's trailer for expected-element lists
pub fn expected_clause(expected: &[String]) -> String {
    match expected {
        [] => String::new(),
        [single] => format!(" Expected is ( {} ).", single),
        many => format!(" Expected is one of ( {} ).", many.join(", ")),
    }
}

fn walk<'a>(mut stack: Stack<'a>, visit: &mut dyn FnMut(Step<'a>)) {
    let Some(top) = stack.pop() else {
        visit(Step::End);
        return;
    };

    match top {
        Frame::Iter {
            particle,
            done,
            fresh,
        } => {
            if !fresh && particle.occurs.allows_more(done) {
                begin(stack.clone(), particle, next_count(particle, done), visit);
            }
            if fresh || done >= particle.occurs.min || particle.term.is_nullable() {
                walk(stack, visit);
            }
        }
        Frame::Start { particle } => begin(stack, particle, next_count(particle, 0), visit),
        Frame::Seq { items, next } => {
            if let Some(item) = items.get(next) {
                stack.push(Frame::Seq {
                    items,
                    next: next + 1,
                });
                stack.push(Frame::Iter {
                    particle: item,
                    done: 0,
                    fresh: false,
                });
            }
            walk(stack, visit);
        }
        Frame::All { items, used } => {
            for (i, item) in items.iter().enumerate().take(MAX_ALL_MEMBERS) {
                if used & (1 << i) == 0 {
                    let mut next = stack.clone();
                    next.push(Frame::All {
                        items,
                        used: used | (1 << i),
                    });
                    next.push(Frame::Start { particle: item });
                    walk(next, visit);
                }
            }

            let rest_emptiable = items
                .iter()
                .enumerate()
                .take(MAX_ALL_MEMBERS)
                .all(|(i, item)| used & (1 << i) != 0 || item.is_emptiable());
            if rest_emptiable {
                walk(stack, visit);
            }
        }
    }
}

/// Enter one more iteration of `particle`; `count` is its count afterwards
fn begin<'a>(
    mut stack: Stack<'a>,
    particle: &'a Particle,
    count: u32,
    visit: &mut dyn FnMut(Step<'a>),
) {
    match &particle.term {
        Term::Element(_) | Term::ElementRef(_) | Term::Any(_) => {
            stack.push(Frame::Iter {
                particle,
                done: count,
                fresh: false,
            });
            visit(Step::Leaf(&particle.term, stack));
        }
        Term::Sequence(items) => {
            stack.push(Frame::Iter {
                particle,
                done: count,
                fresh: true,
            });
            stack.push(Frame::Seq { items, next: 0 });
            walk(stack, visit);
        }
        Term::Choice(items) => {
            stack.push(Frame::Iter {
                particle,
                done: count,
                fresh: true,
            });
            for item in items {
                let mut next = stack.clone();
                next.push(Frame::Iter {
                    particle: item,
                    done: 0,
                    fresh: false,
                });
                walk(next, visit);
            }
        }
        Term::All(items) => {
            stack.push(Frame::Iter {
                particle,
                done: count,
                fresh: true,
            });
            stack.push(Frame::All { items, used: 0 });
            walk(stack, visit);
        }
    }
}

/// Counts past `minOccurs` of an unbounded particle are indistinguishable
fn next_count(particle: &Particle, done: u32) -> u32 {
    match particle.occurs.max {
        None => done.saturating_add(1).min(particle.occurs.min.max(1)),
        Some(_) => done.saturating_add(1),
    }
}

/// After a child was consumed every open iteration is non-empty
fn settle(stack: &mut Stack<'_>) {
    for frame in stack.iter_mut() {
        if let Frame::Iter { fresh, .. } = frame {
            *fresh = false;
        }
    }
}

fn match_term<'a>(
    term: &'a Term,
    name: &QName,
    lookup: &'a dyn ComponentLookup,
) -> Option<Matched<'a>> {
    match term {
        Term::Element(decl) if &decl.name == name => Some(Matched::Element(decl.as_ref())),
        Term::ElementRef(target) if target == name => lookup
            .global_element(target)
            .map(|decl| Matched::Element(decl.as_ref())),
        Term::Any(wildcard) if wildcard.matches(name.namespace()) => {
            Some(Matched::Wildcard(wildcard))
        }
        _ => None,
    }
}

fn term_label(term: &Term) -> String {
    match term {
        Term::Element(decl) => decl.name.to_string(),
        Term::ElementRef(name) => name.to_string(),
        Term::Any(wildcard) => match &wildcard.namespaces {
            NamespaceConstraint::Any => "*".to_string(),
            NamespaceConstraint::Other(tns) => format!("##other{{{}}}*", tns),
            NamespaceConstraint::Enumeration(set) => set
                .iter()
                .map(|ns| {
                    if ns.is_empty() {
                        "*".to_string()
                    } else {
                        format!("{{{}}}*", ns)
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        },
        Term::Sequence(_) | Term::Choice(_) | Term::All(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NFE_NAMESPACE;
    use crate::validators::attributes::AttributeDecl;
    use crate::validators::base::{TypeDef, TypeRef};
    use crate::validators::particles::Occurs;
    use crate::validators::wildcards::ProcessContents;
    use indexmap::IndexMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct Globals(IndexMap<QName, Arc<ElementDecl>>);

    impl ComponentLookup for Globals {
        fn global_element(&self, name: &QName) -> Option<&Arc<ElementDecl>> {
            self.0.get(name)
        }

        fn global_attribute(&self, _: &QName) -> Option<&Arc<AttributeDecl>> {
            None
        }

        fn type_definition(&self, _: &QName) -> Option<&TypeDef> {
            None
        }
    }

    fn name(local: &str) -> QName {
        QName::namespaced(NFE_NAMESPACE, local)
    }

    fn decl(local: &str) -> Arc<ElementDecl> {
        Arc::new(ElementDecl::new(name(local), TypeRef::Named(QName::xsd("string"))))
    }

    fn el(local: &str, min: u32, max: Option<u32>) -> Particle {
        Particle::new(Term::Element(decl(local)), Occurs::new(min, max))
    }

    fn seq(items: Vec<Particle>) -> Particle {
        Particle::new(Term::Sequence(items), Occurs::once())
    }

    fn run(model: &Particle, children: &[&str]) -> Result<(), (usize, Vec<String>)> {
        let globals = Globals::default();
        let mut matcher = ContentMatcher::new(model, &globals);
        for (i, child) in children.iter().enumerate() {
            matcher.push(&name(child)).map_err(|expected| (i, expected))?;
        }
        matcher.finish().map_err(|expected| (children.len(), expected))
    }

    fn det_pag() -> Particle {
        seq(vec![el("tPag", 1, Some(1)), el("xPag", 0, Some(1)), el("vPag", 1, Some(1))])
    }

    #[test]
    fn test_sequence_accepts_in_order() {
        assert!(run(&det_pag(), &["tPag", "vPag"]).is_ok());
        assert!(run(&det_pag(), &["tPag", "xPag", "vPag"]).is_ok());
    }

    #[test]
    fn test_unexpected_child_reports_expected() {
        let (at, expected) = run(&det_pag(), &["indPag", "tPag", "vPag"]).unwrap_err();
        assert_eq!(at, 0);
        assert_eq!(expected, vec![format!("{{{}}}tPag", NFE_NAMESPACE)]);
        assert_eq!(
            expected_clause(&expected),
            format!(" Expected is ( {{{}}}tPag ).", NFE_NAMESPACE)
        );
    }

    #[test]
    fn test_missing_child_reports_expected() {
        let (at, expected) = run(&det_pag(), &["tPag"]).unwrap_err();
        assert_eq!(at, 1);
        assert_eq!(expected.len(), 2);
        assert!(expected_clause(&expected).starts_with(" Expected is one of ("));
    }

    #[test]
    fn test_large_bounds_are_counted() {
        let model = seq(vec![el("ide", 1, Some(1)), el("det", 1, Some(990))]);
        let mut children = vec!["ide"];
        children.extend(std::iter::repeat("det").take(990));
        assert!(run(&model, &children).is_ok());

        children.push("det");
        let (at, expected) = run(&model, &children).unwrap_err();
        assert_eq!(at, 991);
        assert!(expected.is_empty());

        assert!(run(&model, &["ide"]).is_err());
    }

    #[test]
    fn test_choice_and_repetition() {
        let choice = Particle::new(
            Term::Choice(vec![el("CNPJ", 1, Some(1)), el("CPF", 1, Some(1))]),
            Occurs::once(),
        );
        let model = seq(vec![choice, el("xNome", 0, Some(1))]);
        assert!(run(&model, &["CPF", "xNome"]).is_ok());
        assert!(run(&model, &["CNPJ"]).is_ok());
        assert!(run(&model, &["CNPJ", "CPF"]).is_err());
        assert!(run(&model, &[]).is_err());
    }

    #[test]
    fn test_nullable_group_under_unbounded_terminates() {
        let inner = Particle::new(
            Term::Sequence(vec![el("a", 0, Some(1)), el("b", 0, Some(1))]),
            Occurs::zero_or_more(),
        );
        let model = seq(vec![inner, el("c", 1, Some(1))]);
        assert!(run(&model, &["c"]).is_ok());
        assert!(run(&model, &["a", "b", "b", "a", "c"]).is_ok());
        assert!(run(&model, &["a", "b"]).is_err());
    }

    #[test]
    fn test_all_group() {
        let model = Particle::new(
            Term::All(vec![el("x", 1, Some(1)), el("y", 0, Some(1)), el("z", 1, Some(1))]),
            Occurs::once(),
        );
        assert!(run(&model, &["z", "x"]).is_ok());
        assert!(run(&model, &["y", "z", "x"]).is_ok());
        assert!(run(&model, &["x", "x", "z"]).is_err());
        assert!(run(&model, &["x"]).is_err());
    }

    #[test]
    fn test_refs_and_wildcards() {
        let mut globals = Globals::default();
        globals.0.insert(name("NFe"), decl("NFe"));

        let signature = Particle::new(
            Term::Any(Wildcard {
                namespaces: NamespaceConstraint::parse("##other", Some(NFE_NAMESPACE)).unwrap(),
                process_contents: ProcessContents::Lax,
            }),
            Occurs::optional(),
        );
        let model = seq(vec![
            Particle::new(Term::ElementRef(name("NFe")), Occurs::new(1, Some(50))),
            signature,
        ]);

        let mut matcher = ContentMatcher::new(&model, &globals);
        assert!(matches!(
            matcher.push(&name("NFe")),
            Ok(Matched::Element(d)) if d.name == name("NFe")
        ));
        let sig = QName::namespaced("http://www.w3.org/2000/09/xmldsig#", "Signature");
        assert!(matches!(matcher.push(&sig), Ok(Matched::Wildcard(_))));
        assert!(matcher.finish().is_ok());

        let mut other = ContentMatcher::new(&model, &globals);
        let expected = other.push(&name("infNFe")).unwrap_err();
        assert_eq!(expected, vec![name("NFe").to_string()]);
    }
}
