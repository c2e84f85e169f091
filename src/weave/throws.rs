//! Exception sets of node scopes.

use crate::grammar::{Expansion, GrammarFile, Production};
use std::collections::{BTreeSet, HashSet};

pub const PARSE_EXCEPTION: &str = "ParseException";
pub const RUNTIME_EXCEPTION: &str = "RuntimeException";

/// Exception names a scope's catch block must rethrow unchanged.
///
/// This is everything thrown by the enclosing production and by every
/// production transitively reachable from `body`, plus the parse exception
/// and the runtime exception. References to undeclared productions
/// contribute nothing. The two standard names come first, the rest is
/// sorted.
pub fn exception_set(
    grammar: &GrammarFile,
    enclosing: Option<&Production>,
    body: &Expansion,
) -> Vec<String> {
    let mut thrown = BTreeSet::new();
    let mut visited = HashSet::new();

    if let Some(production) = enclosing {
        visited.insert(production.name.as_str());
        thrown.extend(production.throws.iter().cloned());
    }
    collect(grammar, body, &mut visited, &mut thrown);
    with_standard_exceptions(thrown)
}

/// Exception set of a JAVACODE production, whose body cannot be analysed:
/// only its declared `throws` clause counts.
pub fn declared_exception_set(throws: &[String]) -> Vec<String> {
    with_standard_exceptions(throws.iter().cloned().collect())
}

fn with_standard_exceptions(thrown: BTreeSet<String>) -> Vec<String> {
    let mut result = vec![RUNTIME_EXCEPTION.to_string(), PARSE_EXCEPTION.to_string()];
    result.extend(
        thrown
            .into_iter()
            .filter(|e| e != RUNTIME_EXCEPTION && e != PARSE_EXCEPTION),
    );
    result
}

fn collect<'g>(
    grammar: &'g GrammarFile,
    body: &'g Expansion,
    visited: &mut HashSet<&'g str>,
    thrown: &mut BTreeSet<String>,
) {
    let mut referenced = Vec::new();
    body.walk(&mut |e| {
        if let Expansion::NonTerminal { name, .. } = e {
            referenced.push(name.as_str());
        }
    });

    for name in referenced {
        if !visited.insert(name) {
            continue;
        }
        let Some(production) = grammar.production(name) else {
            continue;
        };
        thrown.extend(production.throws.iter().cloned());
        if let Some(expansion) = production.expansion() {
            collect(grammar, expansion, visited, thrown);
        }
    }
}
