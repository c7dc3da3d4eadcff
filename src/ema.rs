//! EMA feed records and the fixed taxonomy tables used to fill them.

use serde::Serialize;

pub type Table = &'static [(&'static str, &'static str)];

pub fn lookup(table: Table, key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// License assumed for items that do not declare one.
pub const DEFAULT_LICENSE: &str = "cc-by-nc-sa";
pub const OTHER_LICENSE: &str = "1-OST";
pub const YT_STANDARD_LICENSE: &str = "yt-standard";
pub const YT_TERMS_URL: &str = "https://www.youtube.com/static?template=terms&gl=CZ";

pub struct EmaTables {
    pub autor: &'static str,
    pub jazyk: &'static str,
    /// Open educational resource flag.
    pub dostupnost: &'static str,
    pub typ: Table,
    pub licence: Table,
    /// Keyed by course / schema.
    pub stupen_vzdelavani: Table,
    /// Keyed by subject.
    pub vzdelavaci_obor: Table,
    /// Keyed by course / schema.
    pub rocnik: Table,
    /// Keyed by subject.
    pub gramotnost: Table,
}

const TYP: Table = &[("video", "8-VI"), ("exercise", "8-IC"), ("article", "8-CL")];

const LICENCE: Table = &[
    ("cc-by-nc-nd", "1-CCBYNCND30"),
    ("cc-by-nc-sa", "1-CCBYNCSA30"),
    ("cc-by-sa", "1-CCBYSA30"),
    ("yt-standard", "1-OST"),
];

pub const KA_TABLES: EmaTables = EmaTables {
    autor: "Khan Academy",
    jazyk: "5-cs",
    dostupnost: "7-ANO",
    typ: TYP,
    licence: LICENCE,
    stupen_vzdelavani: &[
        ("early-math", "2-Z"),
        ("arithmetic", "2-Z"),
        ("pre-algebra", "2-Z"),
        ("basic-geo", "2-Z"),
        ("algebra-basics", "2-Z"),
        ("trigonometry", "2-G"),
        ("music", "2-NU"),
        ("cosmology-and-astronomy", "2-NU"),
    ],
    vzdelavaci_obor: &[("math", "9-03"), ("music", "9-11"), ("astro", "9-09")],
    rocnik: &[("early-math", "3-Z13"), ("trigonometry", "3-SS")],
    gramotnost: &[("math", "4-MA"), ("music", "4-NU"), ("astro", "4-PR")],
};

/// `obecna-chemie` has no grade level or school year entry, so its items omit both fields.
pub const KS_TABLES: EmaTables = EmaTables {
    autor: "Khanova škola",
    jazyk: "5-cs",
    dostupnost: "7-ANO",
    typ: TYP,
    licence: LICENCE,
    stupen_vzdelavani: &[
        ("basic-geo", "2-Z"),
        ("algebra-basics", "2-Z"),
        ("organicka-chemie", "2-G"),
        ("fyzikalni-chemie", "2-G"),
    ],
    vzdelavaci_obor: &[("math", "9-03"), ("chem", "9-08")],
    rocnik: &[("early-math", "3-Z13"), ("organicka-chemie", "3-SS")],
    gramotnost: &[("math", "4-MA"), ("music", "4-NU"), ("chem", "4-PR"), ("astro", "4-PR")],
};

/// Khan Academy ids are strings, Khanova škola ids are database integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum EmaId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for EmaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmaId::Text(s) => f.write_str(s),
            EmaId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmaItem {
    pub id: EmaId,
    pub url: String,
    pub nazev: String,
    pub popis: String,
    pub autor: &'static str,
    pub jazyk: &'static str,
    pub dostupnost: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licence: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licence_url: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stupen_vzdelavani: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vzdelavaci_obor: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gramotnost: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rocnik: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum_vzniku: Option<String>,
}
