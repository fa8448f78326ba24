//! Payloads exchanged with the deploy service.
//!
//! Every field defaults, so a partial (or empty) response still decodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A deployed multi-target application
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Mta {
    pub metadata: MtaMetadata,
    pub modules: Vec<Module>,
    /// Names of the service instances the MTA owns
    pub services: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MtaMetadata {
    pub id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// One deployed module and the application backing it
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Module {
    pub module_name: String,
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    pub provided_dendency_names: Vec<String>,
    pub services: Vec<String>,
    pub uris: Vec<String>,
}

/// A deploy, undeploy or blue-green-deploy process
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mta_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub acquired_lock: bool,
    /// `RUNNING`, `FINISHED`, `ERROR`, `ABORTED` or `ACTION_REQUIRED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// A progress message attached to an operation
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Message {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

/// A log file written by an operation
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Log {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_info: Option<String>,
}

/// An uploaded archive or extension descriptor
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    pub size: i64,
    pub digest: String,
    pub digest_algorithm: String,
    pub space: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// What the deploy service reports about itself
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Info {
    pub api_version: i64,
}

/// Everything deployed in a space, as listed by the REST API
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Components {
    pub mtas: Vec<Mta>,
    /// Applications that are not part of any MTA
    pub standalone_apps: Vec<String>,
}

/// Long-running-process payloads
pub mod slp {
    use serde::{Deserialize, Serialize};

    /// Describes the service that runs the process
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default, rename_all = "camelCase")]
    pub struct Metadata {
        pub id: String,
        pub version: String,
        pub display_name: String,
        pub description: String,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default, rename_all = "camelCase")]
    pub struct Log {
        pub id: String,
        pub display_name: String,
        pub description: String,
        /// `text/plain` or another media type of the log content
        pub format: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub last_modified: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub external_info: Option<String>,
    }

    /// One step of the process
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default, rename_all = "camelCase")]
    pub struct Task {
        pub id: String,
        #[serde(rename = "type")]
        pub task_type: String,
        pub display_name: String,
        pub description: String,
        pub status: String,
        pub progress: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub parent: Option<String>,
    }

    /// Why the process stopped
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default, rename_all = "camelCase")]
    pub struct ProcessError {
        pub id: String,
        pub code: String,
        pub display_name: String,
        pub description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub external_info: Option<String>,
    }

    /// Something the user can do with the process (`abort`, `retry`, ...)
    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default)]
    pub struct Action {
        pub id: String,
        pub title: String,
        pub description: String,
    }
}
