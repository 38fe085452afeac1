use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Usability,
    Io,
    Description,
    Execution,
    Parametric,
    Error,
}

pub const QUERY_PROMPT: &str = "Can you give me a BioCompute Object (BCO) {domain} domain using the provided information from a bioinformatics workflow documentation. The return response must be valid JSON and must validate against the JSON schema described below. If the information for a field is not provided, leave it blank, do not make up any information. Do not repeat the JSON schema in your response. {domain_prompt}";

pub const SUPPLEMENT_PROMPT: &str = "The top level object definitions referenced by the schema (uri, object_id, contributor) must be inlined in the response.";

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Usability,
        Domain::Io,
        Domain::Description,
        Domain::Execution,
        Domain::Parametric,
        Domain::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usability => "usability",
            Self::Io => "io",
            Self::Description => "description",
            Self::Execution => "execution",
            Self::Parametric => "parametric",
            Self::Error => "error",
        }
    }

    /// Short selection code accepted on the command line.
    pub fn code(self) -> &'static str {
        match self {
            Self::Usability => "u",
            Self::Io => "i",
            Self::Description => "d",
            Self::Execution => "e",
            Self::Parametric => "p",
            Self::Error => "err",
        }
    }

    pub fn user_prompt(self) -> &'static str {
        match self {
            Self::Usability => "[u]sability",
            Self::Io => "[i]o",
            Self::Description => "[d]escription",
            Self::Execution => "[e]xecution",
            Self::Parametric => "[p]arametric",
            Self::Error => "[err]or",
        }
    }

    /// Whether the domain schema references top-level object definitions.
    pub fn top_level(self) -> bool {
        matches!(self, Self::Io | Self::Description | Self::Execution)
    }

    pub fn domain_prompt(self) -> &'static str {
        match self {
            Self::Usability => {
                "The usability domain is a plain language description of the purpose and overall goal of the project workflow, analogous to an abstract. Respond with a JSON array of strings."
            }
            Self::Io => {
                "The io domain lists the global input and output files of the computational workflow. Respond with a JSON object holding input_subdomain and output_subdomain arrays of objects with a uri field."
            }
            Self::Description => {
                "The description domain lists the keywords, platform, and pipeline steps of the workflow. Respond with a JSON object holding keywords and pipeline_steps."
            }
            Self::Execution => {
                "The execution domain describes how to run the workflow: script, script_driver, software_prerequisites, external_data_endpoints and environment_variables. Respond with a JSON object."
            }
            Self::Parametric => {
                "The parametric domain lists the non-default parameters used to customize the workflow. Respond with a JSON array of objects with param, value and step fields."
            }
            Self::Error => {
                "The error domain describes the empirical and algorithmic error of the workflow. Respond with a JSON object holding empirical_error and algorithmic_error."
            }
        }
    }

    pub fn query_prompt(self) -> String {
        let mut prompt = QUERY_PROMPT
            .replace("{domain}", self.as_str())
            .replace("{domain_prompt}", self.domain_prompt());
        if self.top_level() {
            prompt.push('\n');
            prompt.push_str(SUPPLEMENT_PROMPT);
        }
        prompt
    }

    pub fn from_selection(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        for domain in Self::ALL {
            if normalized == domain.as_str() || normalized == domain.code() {
                return Ok(domain);
            }
        }

        let options = Self::ALL
            .iter()
            .map(|domain| domain.user_prompt())
            .collect::<Vec<&str>>()
            .join(", ");
        bail!("unrecognized domain `{raw}`, expected one of: {options}")
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
