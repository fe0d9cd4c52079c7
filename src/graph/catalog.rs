// Node catalog for Flow Studio
//
// Static catalog of app integrations and core nodes offered by the editor
// palette. Every entry carries a stable key that identifies the app
// independently of its display attributes.

use super::types::{NodeDescriptor, NodeKind};

/// Palette tab the user is dragging from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteTab {
    #[default]
    Triggers,
    Actions,
}

impl PaletteTab {
    /// Kind given to nodes dropped from this tab when the payload does not say
    pub fn default_kind(self) -> NodeKind {
        match self {
            PaletteTab::Triggers => NodeKind::Trigger,
            PaletteTab::Actions => NodeKind::Action,
        }
    }
}

/// Palette grouping of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteCategory {
    CoreTriggers,
    Logic,
    Helpers,
    Integrations,
}

impl std::fmt::Display for PaletteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteCategory::CoreTriggers => write!(f, "Core Triggers"),
            PaletteCategory::Logic => write!(f, "Logic"),
            PaletteCategory::Helpers => write!(f, "Helpers"),
            PaletteCategory::Integrations => write!(f, "Integrations"),
        }
    }
}

/// One palette item
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub descriptor: NodeDescriptor,
    pub category: PaletteCategory,
    pub default_kind: NodeKind,
}

// key, name, icon, color, bg
const APPS: &[(&str, &str, &str, &str, &str)] = &[
    ("openai", "OpenAI", "auto_awesome", "text-emerald-600", "bg-emerald-100"),
    ("slack", "Slack", "chat", "text-purple-600", "bg-purple-100"),
    ("gmail", "Gmail", "mail", "text-red-600", "bg-red-100"),
    ("sheets", "Google Sheets", "table_view", "text-green-600", "bg-green-100"),
    ("hubspot", "HubSpot", "hub", "text-orange-600", "bg-orange-100"),
    ("salesforce", "Salesforce", "cloud", "text-blue-600", "bg-blue-100"),
    ("notion", "Notion", "description", "text-slate-600", "bg-slate-100"),
    ("calendar", "Google Calendar", "calendar_today", "text-blue-500", "bg-blue-100"),
    ("stripe", "Stripe", "payments", "text-indigo-600", "bg-indigo-100"),
    ("shopify", "Shopify", "shopping_bag", "text-green-500", "bg-green-100"),
    ("github", "GitHub", "code", "text-gray-800", "bg-gray-200"),
    ("discord", "Discord", "forum", "text-indigo-500", "bg-indigo-100"),
    ("linkedin", "LinkedIn", "work", "text-blue-700", "bg-blue-100"),
    ("twitter", "X (Twitter)", "flutter", "text-black", "bg-gray-200"),
    ("airtable", "Airtable", "table_chart", "text-yellow-600", "bg-yellow-100"),
    ("trello", "Trello", "dashboard", "text-blue-500", "bg-blue-50"),
    ("asana", "Asana", "task_alt", "text-red-500", "bg-red-50"),
    ("drive", "Google Drive", "add_to_drive", "text-green-600", "bg-green-50"),
    ("dropbox", "Dropbox", "inventory_2", "text-blue-700", "bg-blue-50"),
    ("zoom", "Zoom", "videocam", "text-blue-500", "bg-blue-100"),
    ("teams", "Microsoft Teams", "groups", "text-indigo-700", "bg-indigo-50"),
    ("mailchimp", "Mailchimp", "mark_email_unread", "text-yellow-500", "bg-yellow-50"),
    ("telegram", "Telegram", "send", "text-blue-400", "bg-blue-50"),
    ("whatsapp", "WhatsApp", "chat", "text-green-500", "bg-green-50"),
    ("typeform", "Typeform", "dynamic_form", "text-gray-700", "bg-gray-200"),
    ("zendesk", "Zendesk", "headset_mic", "text-green-700", "bg-green-50"),
];

// key, name, icon, color, bg, category
const CORE: &[(&str, &str, &str, &str, &str, PaletteCategory)] = &[
    ("webhook", "Webhook", "webhook", "text-pink-600", "bg-pink-100", PaletteCategory::CoreTriggers),
    ("schedule", "Schedule", "schedule", "text-blue-600", "bg-blue-100", PaletteCategory::CoreTriggers),
    ("manual", "On Click", "touch_app", "text-gray-600", "bg-gray-100", PaletteCategory::CoreTriggers),
    ("form", "Form Trigger", "list_alt", "text-purple-600", "bg-purple-100", PaletteCategory::CoreTriggers),
    ("if", "IF Condition", "call_split", "text-orange-600", "bg-orange-100", PaletteCategory::Logic),
    ("switch", "Switch", "alt_route", "text-orange-600", "bg-orange-100", PaletteCategory::Logic),
    ("merge", "Merge", "call_merge", "text-orange-600", "bg-orange-100", PaletteCategory::Logic),
    ("code", "Code", "code", "text-yellow-600", "bg-yellow-100", PaletteCategory::Helpers),
    ("http", "HTTP Request", "cloud_sync", "text-green-600", "bg-green-100", PaletteCategory::Helpers),
    ("wait", "Wait", "hourglass_empty", "text-gray-600", "bg-gray-100", PaletteCategory::Helpers),
    ("variable", "Set Variable", "data_object", "text-blue-600", "bg-blue-100", PaletteCategory::Helpers),
    ("split", "Split In Batches", "safety_divider", "text-teal-600", "bg-teal-100", PaletteCategory::Helpers),
];

/// Catalog keys of nodes that never need credentials
const CREDENTIAL_FREE: &[&str] = &["switch", "merge", "wait"];

/// Whether a descriptor belongs to a node that never needs credentials.
/// Keyless descriptors are matched on their display name, ignoring case.
pub fn is_credential_free(descriptor: &NodeDescriptor) -> bool {
    let identity = descriptor.identity().trim();
    CREDENTIAL_FREE.iter().any(|k| k.eq_ignore_ascii_case(identity))
}

/// Palette catalog
#[derive(Debug, Clone)]
pub struct NodeCatalog {
    entries: Vec<CatalogEntry>,
}

impl NodeCatalog {
    /// The built-in catalog
    pub fn standard() -> Self {
        let core = CORE.iter().map(|&(key, name, icon, color, bg, category)| CatalogEntry {
            descriptor: NodeDescriptor::new(key, name, icon, color, bg),
            category,
            default_kind: match category {
                PaletteCategory::CoreTriggers => NodeKind::Trigger,
                PaletteCategory::Helpers => NodeKind::Helper,
                _ => NodeKind::Action,
            },
        });
        let apps = APPS.iter().map(|&(key, name, icon, color, bg)| CatalogEntry {
            descriptor: NodeDescriptor::new(key, name, icon, color, bg),
            category: PaletteCategory::Integrations,
            default_kind: NodeKind::Action,
        });

        Self {
            entries: core.chain(apps).collect(),
        }
    }

    /// Look an entry up by its catalog key
    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.key.as_deref() == Some(key))
    }

    /// Descriptor for a catalog key
    pub fn descriptor(&self, key: &str) -> Option<NodeDescriptor> {
        self.get(key).map(|e| e.descriptor.clone())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Palette contents for a tab, filtered by a case-insensitive name query.
    /// Empty categories are omitted.
    pub fn palette(&self, tab: PaletteTab, query: &str) -> Vec<(PaletteCategory, Vec<&CatalogEntry>)> {
        let categories: &[PaletteCategory] = match tab {
            PaletteTab::Triggers => &[PaletteCategory::CoreTriggers, PaletteCategory::Integrations],
            PaletteTab::Actions => &[
                PaletteCategory::Logic,
                PaletteCategory::Helpers,
                PaletteCategory::Integrations,
            ],
        };
        let query = query.trim().to_lowercase();

        categories
            .iter()
            .map(|&category| {
                let items: Vec<&CatalogEntry> = self
                    .entries
                    .iter()
                    .filter(|e| e.category == category)
                    .filter(|e| query.is_empty() || e.descriptor.name.to_lowercase().contains(&query))
                    .collect();
                (category, items)
            })
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }
}

impl Default for NodeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
