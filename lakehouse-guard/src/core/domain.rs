//! Business domains feeding the pipeline.

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One business data source with its own raw schema and expectation suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Orders from the ERP system
    Erp,
    /// Leads from the CRM
    Crm,
    /// Web analytics events
    Web,
    /// Product catalog
    Product,
}

impl Domain {
    /// All domains in pipeline processing order.
    pub const ALL: [Domain; 4] = [Domain::Erp, Domain::Crm, Domain::Web, Domain::Product];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Erp => "erp",
            Domain::Crm => "crm",
            Domain::Web => "web",
            Domain::Product => "product",
        }
    }

    /// Default dataset name, used for bundled file names.
    pub fn default_dataset(&self) -> &'static str {
        match self {
            Domain::Erp => "erp_orders",
            Domain::Crm => "crm_leads",
            Domain::Web => "web_events",
            Domain::Product => "products",
        }
    }

    /// Name of the staging table built from this domain.
    pub fn staging_table(&self) -> &'static str {
        match self {
            Domain::Erp => "stg_erp_orders",
            Domain::Crm => "stg_crm_leads",
            Domain::Web => "stg_web_events",
            Domain::Product => "stg_products",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "erp" => Ok(Domain::Erp),
            "crm" => Ok(Domain::Crm),
            "web" => Ok(Domain::Web),
            "product" => Ok(Domain::Product),
            other => Err(PipelineError::Configuration(format!(
                "Unknown domain '{other}', expected one of erp, crm, web, product"
            ))),
        }
    }
}
