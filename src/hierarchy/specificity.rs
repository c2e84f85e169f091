use std::fmt;

/// How precisely a hierarchy entry designates its node. When several
/// entries resolve to the same name, the most specific one survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Specificity {
    /// Added by orphan adoption; never written by the user.
    Unknown,
    /// Produced by an `r:` pattern.
    Regex,
    /// A bare grammar node name, prefixed and packaged.
    Resolved,
    /// A `%Name`: packaged but not prefixed.
    Quoted,
    /// Any other name, taken as a qualified class name.
    Qname,
    Root,
}

impl Specificity {
    /// Whether the entry designates a node through its grammar name.
    pub fn is_grammar_derived(self) -> bool {
        matches!(
            self,
            Specificity::Unknown | Specificity::Regex | Specificity::Resolved
        )
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Specificity::Unknown => "unknown",
            Specificity::Regex => "regex",
            Specificity::Resolved => "resolved",
            Specificity::Quoted => "quoted",
            Specificity::Qname => "qname",
            Specificity::Root => "root",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specificity_order() {
        let mut all = vec![
            Specificity::Root,
            Specificity::Regex,
            Specificity::Qname,
            Specificity::Unknown,
            Specificity::Quoted,
            Specificity::Resolved,
        ];
        all.sort();
        assert_eq!(
            all,
            vec![
                Specificity::Unknown,
                Specificity::Regex,
                Specificity::Resolved,
                Specificity::Quoted,
                Specificity::Qname,
                Specificity::Root,
            ]
        );
    }
}
