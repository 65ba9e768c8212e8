// src/jobs/mod.rs

//! Named presets: which source to query, how to lay the rows out, and
//! where the file lands by default.

pub mod aws;
pub mod azure;
pub mod grafana;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::ValueEnum;
use reqwest::Client;
use tracing::{info, instrument};

use crate::{config::Config, error::Result, process::Table, retry::RetryPolicy, sink::local};

/// Top-level folder a job's output is filed under, locally and in Drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Aws,
    Azure,
    Grafana,
}

impl Provider {
    pub fn folder(self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Grafana => "Grafana",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Job {
    AwsCostPerService,
    AwsCostPerAccount,
    AwsCostPerServicePerAccount,
    AwsGpuCost,
    AzureCostPerService,
    AzureCognitiveServices,
    AzureCostPerResource,
    AzureCostPerServicePerAccount,
    AzureResources,
    AzureTtsUsage,
    GrafanaDashboards,
    GrafanaDashboardLinks,
}

impl Job {
    pub const ALL: [Job; 12] = [
        Job::AwsCostPerService,
        Job::AwsCostPerAccount,
        Job::AwsCostPerServicePerAccount,
        Job::AwsGpuCost,
        Job::AzureCostPerService,
        Job::AzureCognitiveServices,
        Job::AzureCostPerResource,
        Job::AzureCostPerServicePerAccount,
        Job::AzureResources,
        Job::AzureTtsUsage,
        Job::GrafanaDashboards,
        Job::GrafanaDashboardLinks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Job::AwsCostPerService => "aws-cost-per-service",
            Job::AwsCostPerAccount => "aws-cost-per-account",
            Job::AwsCostPerServicePerAccount => "aws-cost-per-service-per-account",
            Job::AwsGpuCost => "aws-gpu-cost",
            Job::AzureCostPerService => "azure-cost-per-service",
            Job::AzureCognitiveServices => "azure-cognitive-services",
            Job::AzureCostPerResource => "azure-cost-per-resource",
            Job::AzureCostPerServicePerAccount => "azure-cost-per-service-per-account",
            Job::AzureResources => "azure-resources",
            Job::AzureTtsUsage => "azure-tts-usage",
            Job::GrafanaDashboards => "grafana-dashboards",
            Job::GrafanaDashboardLinks => "grafana-dashboard-links",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Job::AwsCostPerService => "AWS daily cost per service, last 7 days",
            Job::AwsCostPerAccount => "AWS daily cost per linked account, last 7 days",
            Job::AwsCostPerServicePerAccount => "AWS daily cost per account and service, last 7 days",
            Job::AwsGpuCost => "AWS EC2 compute cost per linked account, last 7 days",
            Job::AzureCostPerService => "Azure daily cost per service for every subscription",
            Job::AzureCognitiveServices => "Azure Cognitive Services daily cost per subscription",
            Job::AzureCostPerResource => "Azure actual cost per resource, today",
            Job::AzureCostPerServicePerAccount => "Azure 7-day actual cost per subscription and service",
            Job::AzureResources => "Azure resources in every subscription",
            Job::AzureTtsUsage => "Azure TTS synthesized characters per month, last 6 months",
            Job::GrafanaDashboards => "Grafana dashboard titles and UIDs",
            Job::GrafanaDashboardLinks => "Grafana dashboard names, types and URLs",
        }
    }

    pub fn provider(self) -> Provider {
        match self {
            Job::AwsCostPerService
            | Job::AwsCostPerAccount
            | Job::AwsCostPerServicePerAccount
            | Job::AwsGpuCost => Provider::Aws,
            Job::AzureCostPerService
            | Job::AzureCognitiveServices
            | Job::AzureCostPerResource
            | Job::AzureCostPerServicePerAccount
            | Job::AzureResources
            | Job::AzureTtsUsage => Provider::Azure,
            Job::GrafanaDashboards | Job::GrafanaDashboardLinks => Provider::Grafana,
        }
    }

    pub fn header(self) -> &'static [&'static str] {
        match self {
            Job::AwsCostPerService => &["Date", "Service", "Cost (USD)"],
            Job::AwsCostPerAccount => &["Date", "Account ID", "Cost (USD)"],
            Job::AwsCostPerServicePerAccount => &["Date", "Account", "Service", "Cost (USD)"],
            Job::AwsGpuCost => &["Account", "Date", "Cost"],
            Job::AzureCostPerService => &[
                "SubscriptionID",
                "SubscriptionName",
                "PreTaxCost",
                "UsageDate",
                "ServiceName",
            ],
            Job::AzureCognitiveServices => &[
                "SubscriptionID",
                "PreTaxCost",
                "UsageDate",
                "ServiceName",
                "Currency",
            ],
            Job::AzureCostPerResource => &[
                "UsageDate",
                "CostUSD",
                "ResourceId",
                "ResourceType",
                "ResourceLocation",
                "ResourceGroupName",
                "ServiceName",
                "ServiceTier",
                "Meter",
                "Currency",
            ],
            Job::AzureCostPerServicePerAccount => &["Subscription", "Service", "Cost (USD)", "Currency"],
            Job::AzureResources => &["SubscriptionID", "ResourceName", "ResourceType", "Location"],
            Job::AzureTtsUsage => &["Month", "TTS Duration (Characters)"],
            Job::GrafanaDashboards => &["Title", "UID"],
            Job::GrafanaDashboardLinks => &["Dashboard Name", "Type", "URL"],
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Job::AwsCostPerService => "aws-cost-per-service.csv",
            Job::AwsCostPerAccount => "aws-cost-per-account.csv",
            Job::AwsCostPerServicePerAccount => "aws_cost_per_service_per_account.csv",
            Job::AwsGpuCost => "aws-gpu-cost-per-account.csv",
            Job::AzureCostPerService => "azure_cost_data_per_service_per_account.csv",
            Job::AzureCognitiveServices => "azure_cognitive_services_cost_data.csv",
            Job::AzureCostPerResource => "azure_cost_resources.csv",
            Job::AzureCostPerServicePerAccount => "azure-cost-per-service-per-account.csv",
            Job::AzureResources => "azure_resources.csv",
            Job::AzureTtsUsage => "tts_usage.csv",
            Job::GrafanaDashboards => "grafana_dashboards.csv",
            Job::GrafanaDashboardLinks => "grafana_dashboard_links.csv",
        }
    }

    /// Extra directory between the dated folder and the file.
    pub fn subdir(self) -> Option<&'static str> {
        match self {
            Job::AwsCostPerServicePerAccount => Some("aws_cost_per_service_per_account"),
            _ => None,
        }
    }

    /// `<root>/<Provider>/<YYYY>/<MM>/<DD>[/<subdir>]/<file>`
    pub fn output_path(self, root: &Path, today: NaiveDate) -> PathBuf {
        local::dated_path(
            root,
            self.provider().folder(),
            today,
            self.subdir(),
            self.file_name(),
        )
    }

    /// Remote folder chain the file is uploaded under.
    pub fn remote_folder(self, today: NaiveDate) -> String {
        local::dated_folder(self.provider().folder(), today)
    }

    pub fn empty_table(self) -> Table {
        Table::new(self.header())
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a job needs to reach its source.
pub struct JobContext<'a> {
    pub config: &'a Config,
    pub http: Client,
    pub today: NaiveDate,
    /// Policy for provider APIs.
    pub api_retry: RetryPolicy,
    /// Policy for the spreadsheet and Drive sinks.
    pub sink_retry: RetryPolicy,
}

impl<'a> JobContext<'a> {
    pub fn new(config: &'a Config, http: Client, today: NaiveDate) -> Self {
        Self {
            config,
            http,
            today,
            api_retry: RetryPolicy::fixed(),
            sink_retry: RetryPolicy::exponential(),
        }
    }

    pub fn with_api_retry(mut self, retry: RetryPolicy) -> Self {
        self.api_retry = retry;
        self
    }

    pub fn with_sink_retry(mut self, retry: RetryPolicy) -> Self {
        self.sink_retry = retry;
        self
    }
}

/// Query the job's source and lay the result out under its header.
#[instrument(level = "info", skip(job, ctx), fields(job = %job))]
pub async fn build_table(job: Job, ctx: &JobContext<'_>) -> Result<Table> {
    info!("fetching");
    let table = match job.provider() {
        Provider::Aws => aws::run(job, ctx).await?,
        Provider::Azure => azure::run(job, ctx).await?,
        Provider::Grafana => grafana::run(job, ctx).await?,
    };
    info!(rows = table.len(), "table built");
    Ok(table)
}
