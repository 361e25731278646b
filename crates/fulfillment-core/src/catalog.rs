//! Product id to plan template mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::Result;

/// Where a product's template lives and how it is named to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    /// Key of the template PDF in the documents bucket.
    pub template_key: String,
    /// Product name used in e-mails.
    pub display_name: String,
}

impl TemplateDescriptor {
    pub fn new(template_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            template_key: template_key.into(),
            display_name: display_name.into(),
        }
    }
}

/// Read-only product catalog with a fallback entry for unknown products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    products: HashMap<String, TemplateDescriptor>,
    default: TemplateDescriptor,
}

impl ProductCatalog {
    /// Create an empty catalog that resolves everything to `default`.
    pub fn new(default: TemplateDescriptor) -> Self {
        Self {
            products: HashMap::new(),
            default,
        }
    }

    /// Add or replace a product entry.
    pub fn with_product(mut self, product_id: impl Into<String>, template: TemplateDescriptor) -> Self {
        self.products.insert(product_id.into(), template);
        self
    }

    /// Load a catalog from a TOML, YAML or JSON file.
    ///
    /// ```toml
    /// [default]
    /// template_key = "templates/default-template.pdf"
    /// display_name = "Furniture Plans"
    ///
    /// [products.796585]
    /// template_key = "templates/workbench-plans.pdf"
    /// display_name = "Workbench"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let catalog = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(catalog)
    }

    /// Template for a product, falling back to the default entry.
    pub fn resolve(&self, product_id: &str) -> &TemplateDescriptor {
        self.products.get(product_id).unwrap_or(&self.default)
    }

    /// Whether the product has its own entry.
    pub fn contains(&self, product_id: &str) -> bool {
        self.products.contains_key(product_id)
    }

    pub fn default_template(&self) -> &TemplateDescriptor {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new(TemplateDescriptor::new(
            "templates/default-template.pdf",
            "Furniture Plans",
        ))
        .with_product(
            "796585",
            TemplateDescriptor::new("templates/workbench-plans.pdf", "Workbench"),
        )
    }
}
