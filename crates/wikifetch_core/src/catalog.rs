use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::config::CatalogSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Bandplans,
    DigitalModes,
    Software,
    Radios,
    Antennas,
    Electronics,
    Emcomm,
    Propagation,
    Reference,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Bandplans,
        Self::DigitalModes,
        Self::Software,
        Self::Radios,
        Self::Antennas,
        Self::Electronics,
        Self::Emcomm,
        Self::Propagation,
        Self::Reference,
    ];

    /// Category used for titles missing from the mapping.
    pub const FALLBACK: Category = Self::Reference;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bandplans => "bandplans",
            Self::DigitalModes => "digital-modes",
            Self::Software => "software",
            Self::Radios => "radios",
            Self::Antennas => "antennas",
            Self::Electronics => "electronics",
            Self::Emcomm => "emcomm",
            Self::Propagation => "propagation",
            Self::Reference => "reference",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        for category in Self::ALL {
            if category.as_str().eq_ignore_ascii_case(trimmed) {
                return Ok(category);
            }
        }
        let known = Self::ALL
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join("|");
        bail!("unknown category: {value} (expected {known})")
    }
}

const BUILTIN_CATALOG: &[(&str, Category)] = &[
    ("Amateur_radio", Category::Reference),
    ("Amateur_radio_operator", Category::Reference),
    ("Amateur_radio_licensing", Category::Reference),
    ("Call_sign", Category::Reference),
    ("ITU_prefix", Category::Reference),
    ("Amateur_radio_frequency_allocations", Category::Bandplans),
    ("Shortwave_bands", Category::Bandplans),
    ("High_frequency", Category::Bandplans),
    ("Very_high_frequency", Category::Bandplans),
    ("Ultra_high_frequency", Category::Bandplans),
    ("Radio_propagation", Category::Propagation),
    ("Skywave", Category::Propagation),
    ("Ground_wave", Category::Propagation),
    ("Near_vertical_incidence_skywave", Category::Propagation),
    ("Sporadic_E_propagation", Category::Propagation),
    ("Tropospheric_propagation", Category::Propagation),
    ("Ionosphere", Category::Propagation),
    ("Solar_cycle", Category::Propagation),
    ("Sunspot", Category::Propagation),
    ("Grey_line_(radio)", Category::Propagation),
    ("Antenna_(radio)", Category::Antennas),
    ("Dipole_antenna", Category::Antennas),
    ("Yagi-Uda_antenna", Category::Antennas),
    ("Vertical_antenna_(radio)", Category::Antennas),
    ("Loop_antenna", Category::Antennas),
    ("Random_wire_antenna", Category::Antennas),
    ("Balun", Category::Antennas),
    ("Antenna_tuner", Category::Antennas),
    ("Feed_line", Category::Antennas),
    ("G5RV_antenna", Category::Antennas),
    ("Standing_wave_ratio", Category::Electronics),
    ("Impedance_matching", Category::Electronics),
    ("Coaxial_cable", Category::Electronics),
    ("RF_connector", Category::Electronics),
    ("Ohm%27s_law", Category::Electronics),
    ("Decibel", Category::Electronics),
    ("Electronic_filter", Category::Electronics),
    ("Low-pass_filter", Category::Electronics),
    ("Dummy_load", Category::Electronics),
    ("Power_supply", Category::Electronics),
    ("Smith_chart", Category::Electronics),
    ("Electromagnetic_spectrum", Category::Electronics),
    ("FT8", Category::DigitalModes),
    ("PSK31", Category::DigitalModes),
    ("Radioteletype", Category::DigitalModes),
    ("Packet_radio", Category::DigitalModes),
    ("AX.25", Category::DigitalModes),
    ("Morse_code", Category::DigitalModes),
    ("WSJT_(amateur_radio_software)", Category::Software),
    ("Fldigi", Category::Software),
    ("Winlink", Category::Software),
    ("Software-defined_radio", Category::Software),
    ("RTL-SDR", Category::Software),
    ("Automatic_Packet_Reporting_System", Category::Software),
    ("Transceiver", Category::Radios),
    ("Amateur_radio_repeater", Category::Radios),
    ("Icom", Category::Radios),
    ("Yaesu_(brand)", Category::Radios),
    ("Kenwood_Corporation", Category::Radios),
    ("Amateur_radio_emergency_communications", Category::Emcomm),
    ("Amateur_Radio_Emergency_Service", Category::Emcomm),
    ("Radio_Amateur_Civil_Emergency_Service", Category::Emcomm),
    ("NATO_phonetic_alphabet", Category::Reference),
    ("Q_code", Category::Reference),
    ("RST_code", Category::Reference),
    ("QSO", Category::Reference),
    ("Contesting", Category::Reference),
    ("QRP_operation", Category::Reference),
    ("Amateur_satellite", Category::Reference),
    ("OSCAR", Category::Reference),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSpec {
    pub title: String,
    pub category: Category,
}

impl ArticleSpec {
    pub fn slug(&self) -> String {
        slug_for_title(&self.title)
    }
}

/// Ordered list of titles plus the title->category table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    titles: Vec<String>,
    categories: BTreeMap<String, Category>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            titles: BUILTIN_CATALOG
                .iter()
                .map(|(title, _)| (*title).to_string())
                .collect(),
            categories: BUILTIN_CATALOG
                .iter()
                .map(|(title, category)| ((*title).to_string(), *category))
                .collect(),
        }
    }

    /// Built-in catalog with config overrides applied. A non-empty
    /// `articles` list replaces the built-in titles; `categories` entries
    /// are layered over the built-in table.
    pub fn from_config(section: &CatalogSection) -> Result<Self> {
        let mut catalog = Self::builtin();
        let titles = section
            .articles
            .iter()
            .map(|title| title.trim())
            .filter(|title| !title.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        if !titles.is_empty() {
            catalog.titles = titles;
        }
        for (title, name) in &section.categories {
            let title = title.trim();
            if title.is_empty() {
                bail!("catalog category override has an empty title");
            }
            catalog
                .categories
                .insert(title.to_string(), Category::parse(name)?);
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn category_for(&self, title: &str) -> Category {
        self.categories
            .get(title)
            .copied()
            .unwrap_or(Category::FALLBACK)
    }

    pub fn spec_for(&self, title: &str) -> ArticleSpec {
        ArticleSpec {
            title: title.to_string(),
            category: self.category_for(title),
        }
    }

    pub fn specs(&self) -> impl Iterator<Item = ArticleSpec> + '_ {
        self.titles.iter().map(|title| self.spec_for(title))
    }
}

/// Filesystem-safe, lower-cased identifier for a title.
pub fn slug_for_title(title: &str) -> String {
    let lowered = title
        .to_lowercase()
        .replace('_', "-")
        .replace("%27", "")
        .replace("%e2%80%93", "-");
    let slug = lowered
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == '-')
        .collect::<String>();
    if slug.is_empty() {
        return "untitled".to_string();
    }
    slug
}
