//! Record types for the bundled extraction scenarios.
//!
//! Each type pairs a serde representation with the [`Schema`] sent to the
//! model. Closed vocabularies are Rust enums; their schema members come from
//! the same `ALL` tables used for (de)serialization, so the two cannot drift.

use crate::llm_extractor::Extractable;
use crate::schema::{FieldType, Schema};
use crate::tools::{ToolCall, ToolSet, ToolSignature};
use crate::ExtractError;
use serde::{Deserialize, Serialize};

macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn field_type() -> FieldType {
                FieldType::enumeration(Self::ALL.iter().map(|v| v.label()))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

closed_enum!(
    /// Technologies a hack submission may declare.
    Technology {
        JavaScript => "JavaScript",
        Python => "Python",
        DotNet => ".NET",
        AiStudio => "AI Studio",
        AiSearch => "AI Search",
        PostgreSql => "PostgreSQL",
        CosmosDb => "CosmosDB",
        AzureSql => "Azure SQL",
    }
);

closed_enum!(Language {
    JavaScript => "JavaScript",
    Python => "Python",
    DotNet => ".NET",
});

closed_enum!(AzureService {
    AiStudio => "AI Studio",
    AiSearch => "AI Search",
    PostgreSql => "PostgreSQL",
    CosmosDb => "CosmosDB",
    AzureSql => "Azure SQL",
});

closed_enum!(Framework {
    Langchain => "Langchain",
    SemanticKernel => "Semantic Kernel",
    Llamaindex => "Llamaindex",
    Autogen => "Autogen",
    SpringBoot => "Spring Boot",
    Prompty => "Prompty",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackSubmission {
    pub name: String,
    pub description: String,
    pub technologies: Vec<Technology>,
    pub repository_url: String,
    pub video_url: String,
    pub team_members: Vec<String>,
}

impl Extractable for HackSubmission {
    fn schema() -> Schema {
        Schema::new("HackSubmission")
            .field("name", FieldType::String)
            .described_field(
                "description",
                FieldType::String,
                "A 1-2 sentence description of the project",
            )
            .field("technologies", FieldType::list(Technology::field_type()))
            .field("repository_url", FieldType::String)
            .field("video_url", FieldType::String)
            .field("team_members", FieldType::list(FieldType::String))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoOverview {
    pub name: String,
    pub description: String,
    pub languages: Vec<Language>,
    pub azure_services: Vec<AzureService>,
    pub frameworks: Vec<Framework>,
}

impl Extractable for RepoOverview {
    fn schema() -> Schema {
        Schema::new("RepoOverview")
            .field("name", FieldType::String)
            .described_field(
                "description",
                FieldType::String,
                "A 1-2 sentence description of the project",
            )
            .field("languages", FieldType::list(Language::field_type()))
            .field("azure_services", FieldType::list(AzureService::field_type()))
            .field("frameworks", FieldType::list(Framework::field_type()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

impl Extractable for BlogPost {
    fn schema() -> Schema {
        Schema::new("BlogPost")
            .field("title", FieldType::String)
            .described_field(
                "summary",
                FieldType::String,
                "A 1-2 sentence summary of the blog post",
            )
            .described_field(
                "tags",
                FieldType::list(FieldType::String),
                "A list of tags for the blog post, like 'python' or 'openai'",
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub product: String,
    pub price: f64,
    pub quantity: i64,
}

impl Item {
    fn schema() -> Schema {
        Schema::new("Item")
            .field("product", FieldType::String)
            .field("price", FieldType::Number)
            .field("quantity", FieldType::Integer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub total: f64,
    pub shipping: f64,
    pub payment_method: String,
    pub items: Vec<Item>,
    pub order_number: i64,
}

impl Extractable for Receipt {
    fn schema() -> Schema {
        Schema::new("Receipt")
            .field("total", FieldType::Number)
            .field("shipping", FieldType::Number)
            .field("payment_method", FieldType::String)
            .field("items", FieldType::list(FieldType::record(Item::schema())))
            .field("order_number", FieldType::Integer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub title: String,
    pub description: String,
    pub x_axis: String,
    pub y_axis: String,
    pub legend: Vec<String>,
}

impl Extractable for Graph {
    fn schema() -> Schema {
        Schema::new("Graph")
            .field("title", FieldType::String)
            .described_field(
                "description",
                FieldType::String,
                "1 sentence description of the graph",
            )
            .field("x_axis", FieldType::String)
            .field("y_axis", FieldType::String)
            .field("legend", FieldType::list(FieldType::String))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub species: String,
    pub common_name: String,
    pub quantity: i64,
    pub size: String,
    pub price: f64,
    pub county: String,
    pub notes: String,
}

impl Plant {
    fn schema() -> Schema {
        Schema::new("Plant")
            .field("species", FieldType::String)
            .field("common_name", FieldType::String)
            .field("quantity", FieldType::Integer)
            .field("size", FieldType::String)
            .field("price", FieldType::Number)
            .field("county", FieldType::String)
            .field("notes", FieldType::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantInventory {
    pub annuals: Vec<Plant>,
    pub bulbs: Vec<Plant>,
    pub grasses: Vec<Plant>,
}

impl Extractable for PlantInventory {
    fn schema() -> Schema {
        let plants = || FieldType::list(FieldType::record(Plant::schema()));
        Schema::new("PlantInventory")
            .field("annuals", plants())
            .field("bulbs", plants())
            .field("grasses", plants())
    }
}

/// What to do with the company's documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentAction {
    SummarizeDocument { filename: String },
    SearchDocuments { query: String },
}

impl ToolSet for DocumentAction {
    fn signatures() -> Vec<ToolSignature> {
        vec![
            ToolSignature::from_schema(
                Schema::new("SummarizeDocument").field("filename", FieldType::String),
            ),
            ToolSignature::from_schema(
                Schema::new("SearchDocuments").field("query", FieldType::String),
            ),
        ]
    }

    fn from_call(call: ToolCall) -> Result<Self, ExtractError> {
        match call.name.as_str() {
            "SummarizeDocument" => Ok(DocumentAction::SummarizeDocument {
                filename: call.str_arg("filename")?,
            }),
            "SearchDocuments" => Ok(DocumentAction::SearchDocuments {
                query: call.str_arg("query")?,
            }),
            _ => Err(ExtractError::UnknownTool(call.name)),
        }
    }
}

impl std::fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentAction::SummarizeDocument { filename } => write!(f, "Summarizing {}", filename),
            DocumentAction::SearchDocuments { query } => write!(f, "Searching {}", query),
        }
    }
}
