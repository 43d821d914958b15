use crate::catalog::{Catalog, ResourceKind};
use crate::model::NamespaceFilter;

const NAMESPACE_PREFIX: &str = "ns";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PaletteCandidate {
    Kind(&'static ResourceKind),
    Namespace(NamespaceFilter),
}

impl PaletteCandidate {
    pub fn label(&self) -> String {
        match self {
            Self::Kind(kind) => format!("{} ({})", kind.label, kind.shortcut),
            Self::Namespace(namespace) => namespace.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PaletteDomain {
    Kinds,
    Namespaces,
}

#[derive(Debug, Clone, Default)]
pub struct CommandPalette {
    open: bool,
    query: String,
}

impl CommandPalette {
    pub fn open(&mut self) {
        self.open = true;
        self.query.clear();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn backspace(&mut self) {
        self.query.pop();
    }

    pub fn domain(&self) -> PaletteDomain {
        split_query(&self.query).0
    }

    pub fn candidates(&self, catalog: &Catalog, namespaces: &[String]) -> Vec<PaletteCandidate> {
        candidates(&self.query, catalog, namespaces)
    }

    /// First candidate of the ordered list, if any. The palette is closed by
    /// the caller only when this returns a candidate.
    pub fn resolve(&self, catalog: &Catalog, namespaces: &[String]) -> Option<PaletteCandidate> {
        self.candidates(catalog, namespaces).into_iter().next()
    }
}

fn split_query(query: &str) -> (PaletteDomain, &str) {
    let prefixed = query
        .get(..NAMESPACE_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(NAMESPACE_PREFIX));
    if prefixed {
        (PaletteDomain::Namespaces, query[NAMESPACE_PREFIX.len()..].trim())
    } else {
        (PaletteDomain::Kinds, query.trim())
    }
}

pub fn candidates(query: &str, catalog: &Catalog, namespaces: &[String]) -> Vec<PaletteCandidate> {
    let (domain, search) = split_query(query);
    let needle = search.to_lowercase();
    match domain {
        PaletteDomain::Kinds => catalog
            .kinds()
            .iter()
            .filter(|kind| {
                needle.is_empty()
                    || kind.label.to_lowercase().contains(&needle)
                    || kind.key.contains(&needle)
            })
            .map(PaletteCandidate::Kind)
            .collect(),
        PaletteDomain::Namespaces => {
            let all = std::iter::once(NamespaceFilter::All);
            let named = namespaces
                .iter()
                .map(|namespace| NamespaceFilter::Named(namespace.clone()));
            // Matching is case-insensitive; only a literal name is promoted.
            let (exact, partial): (Vec<_>, Vec<_>) = all
                .chain(named)
                .filter(|namespace| {
                    needle.is_empty() || namespace.label().to_lowercase().contains(&needle)
                })
                .partition(|namespace| match namespace {
                    NamespaceFilter::Named(name) => !search.is_empty() && name == search,
                    NamespaceFilter::All => false,
                });
            exact
                .into_iter()
                .chain(partial)
                .map(PaletteCandidate::Namespace)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandPalette, PaletteCandidate, PaletteDomain, candidates};
    use crate::catalog::Catalog;
    use crate::model::NamespaceFilter;

    fn namespaces() -> Vec<String> {
        ["default", "preprod", "prod", "kube-system"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn ns_prefix_switches_domain() {
        let mut palette = CommandPalette::default();
        palette.open();
        for c in "NS kube".chars() {
            palette.push(c);
        }
        assert_eq!(palette.domain(), PaletteDomain::Namespaces);
        let catalog = Catalog::validated().unwrap();
        assert_eq!(
            palette.resolve(&catalog, &namespaces()),
            Some(PaletteCandidate::Namespace(NamespaceFilter::Named(
                "kube-system".to_string()
            )))
        );
    }

    #[test]
    fn exact_namespace_wins_over_earlier_partial() {
        let catalog = Catalog::validated().unwrap();
        let found = candidates("ns prod", &catalog, &namespaces());
        assert_eq!(
            found.first(),
            Some(&PaletteCandidate::Namespace(NamespaceFilter::Named(
                "prod".to_string()
            )))
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn exact_promotion_is_case_sensitive() {
        let catalog = Catalog::validated().unwrap();
        let listed = vec!["preprod".to_string(), "prod".to_string()];
        assert_eq!(
            candidates("ns Prod", &catalog, &listed).first(),
            Some(&PaletteCandidate::Namespace(NamespaceFilter::Named(
                "preprod".to_string()
            )))
        );
        assert_eq!(candidates("ns Prod", &catalog, &listed).len(), 2);
    }

    #[test]
    fn partial_namespace_match_is_chosen_without_exact() {
        let catalog = Catalog::validated().unwrap();
        let listed = vec!["default".to_string(), "preprod".to_string()];
        assert_eq!(
            candidates("ns prod", &catalog, &listed).first(),
            Some(&PaletteCandidate::Namespace(NamespaceFilter::Named(
                "preprod".to_string()
            )))
        );
    }

    #[test]
    fn unmatched_namespace_yields_nothing() {
        let catalog = Catalog::validated().unwrap();
        let mut palette = CommandPalette::default();
        palette.open();
        for c in "ns prod".chars() {
            palette.push(c);
        }
        let listed = vec!["default".to_string()];
        assert_eq!(palette.resolve(&catalog, &listed), None);
    }

    #[test]
    fn bare_ns_lists_all_sentinel_first() {
        let catalog = Catalog::validated().unwrap();
        let found = candidates("ns", &catalog, &namespaces());
        assert_eq!(found[0], PaletteCandidate::Namespace(NamespaceFilter::All));
        assert_eq!(found.len(), namespaces().len() + 1);
    }

    #[test]
    fn kinds_match_label_or_key() {
        let catalog = Catalog::validated().unwrap();
        let found = candidates("MAP", &catalog, &[]);
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], PaletteCandidate::Kind(kind) if kind.key == "configmaps"));

        assert_eq!(candidates("", &catalog, &[]).len(), catalog.kinds().len());
        assert!(candidates("zzz", &catalog, &[]).is_empty());
    }

    #[test]
    fn opening_resets_query() {
        let mut palette = CommandPalette::default();
        palette.open();
        palette.push('d');
        palette.close();
        palette.open();
        assert!(palette.query().is_empty());
        assert!(palette.is_open());
    }
}
