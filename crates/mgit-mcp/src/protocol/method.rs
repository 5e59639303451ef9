//! The closed table of RPC methods.

/// Every method the dispatcher routes. Anything else is "method not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `ping`
    Ping,
    /// `shutdown`
    Shutdown,
    /// `notifications/initialized`
    NotificationsInitialized,
    /// `notifications/exit`
    NotificationsExit,
    /// `prompts/list`
    PromptsList,
    /// `prompts/call`
    PromptsCall,
    /// `resources/list`
    ResourcesList,
    /// `resources/read`
    ResourcesRead,
    /// `logging/list`
    LoggingList,
    /// `logging/read`
    LoggingRead,
    /// `roots/list`
    RootsList,
    /// `roots/read`
    RootsRead,
}

impl Method {
    /// Look up a method by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        let method = match name {
            "initialize" => Method::Initialize,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "ping" => Method::Ping,
            "shutdown" => Method::Shutdown,
            "notifications/initialized" => Method::NotificationsInitialized,
            "notifications/exit" => Method::NotificationsExit,
            "prompts/list" => Method::PromptsList,
            "prompts/call" => Method::PromptsCall,
            "resources/list" => Method::ResourcesList,
            "resources/read" => Method::ResourcesRead,
            "logging/list" => Method::LoggingList,
            "logging/read" => Method::LoggingRead,
            "roots/list" => Method::RootsList,
            "roots/read" => Method::RootsRead,
            _ => return None,
        };
        Some(method)
    }

    /// Whether the method is one-way (no response is written).
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Method::NotificationsInitialized | Method::NotificationsExit
        )
    }
}
