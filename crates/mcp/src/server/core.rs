use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, ErrorData, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tollgate_engine::ToolDispatcher;
use tollgate_types::WorkflowEvent;
use tracing::info;

use crate::server::errors::{configuration_error, dispatch_error, internal_error, invalid_params_error, todo_error};
use crate::server::http::McpHttpLogEntry;
use crate::server::log_payload::build_log_payload;
use crate::server::schemas::{
    ActivityWorkflowParam, AnalyzeComplexityParam, CreateTodoListParam, ExecuteOperationParam, ListEndpointsParam,
    OperationDetailParam, ResolveCategoriesParam, TodoListParam, UpdateTodoTaskParam,
};

const SERVER_INSTRUCTIONS: &str = "LLM-ONLY SERVER INSTRUCTIONS.
DISCOVERY CHAIN (never guess endpoint paths):
1) resolve_categories with keywords from the request; auto-select the first category, do not ask the user.
2) list_endpoints for that category.
3) get_operation_detail for the chosen path and method.
4) execute_operation.
OUTCOMES OF execute_operation:
- missing_required_fields => ask the user for exactly the listed fields; never invent values.
- wait_for_confirmation => show confirmation_prompt to the user; only after they approve, resend confirm_request unchanged.
- success | error => report the result.
UPDATES AND DELETES BY NAME: look the record up with a GET call first, show the candidates with their ids, then act on the id.
COMPOUND REQUESTS: call analyze_task_complexity first. strategy=decompose => create_todo_list, then update_todo_task after each step, and delete_todo_list once the plan is finished or abandoned. strategy=workflow => execute_activity_workflow.";

#[derive(Clone)]
pub struct TollgateMcpCore {
    tool_router: ToolRouter<Self>,
    log_sender: Option<UnboundedSender<McpHttpLogEntry>>,
    dispatcher: Arc<ToolDispatcher>,
}

#[tool_router]
impl TollgateMcpCore {
    pub fn new(log_sender: Option<UnboundedSender<McpHttpLogEntry>>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            log_sender,
            dispatcher,
        }
    }

    #[tool(
        annotations(read_only_hint = true),
        description = "Step 1 of discovery. Map keywords from the user's request (Chinese or English, colloquial terms allowed) to API categories. Returns ranked categories with example operations and next_action=auto_select_top_match: continue with the first category immediately, never ask the user to choose. An empty keyword list browses the largest categories."
    )]
    async fn resolve_categories(&self, param: Parameters<ResolveCategoriesParam>) -> Result<CallToolResult, ErrorData> {
        let resolution = self
            .dispatcher
            .resolve_categories(&param.0.clone().into_args())
            .map_err(|error| dispatch_error(&error))?;
        self.respond("resolve_categories", &param.0, &resolution)
    }

    #[tool(
        annotations(read_only_hint = true),
        description = "Step 2 of discovery. List the operations of one category, grouped by HTTP method, optionally filtered by method. An unknown category returns a catalog miss telling you to call resolve_categories again."
    )]
    async fn list_endpoints(&self, param: Parameters<ListEndpointsParam>) -> Result<CallToolResult, ErrorData> {
        let args = param.0.clone().into_args().map_err(invalid_method)?;
        match self.dispatcher.list_endpoints(&args) {
            Ok(listing) => self.respond("list_endpoints", &param.0, &listing),
            Err(miss) => self.respond("list_endpoints", &param.0, &miss),
        }
    }

    #[tool(
        annotations(read_only_hint = true),
        description = "Step 3 of discovery. Return the full contract of one operation: path and query parameters, required body fields with formats and enums, an example body, response codes and whether authentication and confirmation are required. Concrete paths such as /api/students/7 resolve to their template."
    )]
    async fn get_operation_detail(&self, param: Parameters<OperationDetailParam>) -> Result<CallToolResult, ErrorData> {
        let args = param.0.clone().into_args().map_err(invalid_method)?;
        match self.dispatcher.get_operation_detail(&args) {
            Ok(detail) => self.respond("get_operation_detail", &param.0, &detail),
            Err(miss) => self.respond("get_operation_detail", &param.0, &miss),
        }
    }

    #[tool(
        annotations(open_world_hint = true),
        description = "Step 4. Execute one catalog operation. Reads run immediately. Writes stop with status=missing_required_fields (ask the user for the listed fields, never invent values) or status=wait_for_confirmation (show confirmation_prompt; after the user approves, resend confirm_request unchanged). confirmed=true applies to this single call only. To update or delete by name, look the record up with a GET call first and use its id."
    )]
    async fn execute_operation(&self, param: Parameters<ExecuteOperationParam>) -> Result<CallToolResult, ErrorData> {
        let request = param.0.clone().into_request().map_err(invalid_method)?;
        let outcome = self
            .dispatcher
            .execute_operation(request)
            .await
            .map_err(|error| configuration_error(&error))?;
        self.respond("execute_operation", &param.0, &outcome)
    }

    #[tool(
        annotations(read_only_hint = true),
        description = "Score how complex a request is before acting. Returns level, matched signals, estimated steps and a strategy: direct (run the discovery chain), decompose (create_todo_list first) or workflow (execute_activity_workflow). Advisory only."
    )]
    async fn analyze_task_complexity(&self, param: Parameters<AnalyzeComplexityParam>) -> Result<CallToolResult, ErrorData> {
        let assessment = self.dispatcher.analyze_task_complexity(&param.0.clone().into_args());
        self.respond("analyze_task_complexity", &param.0, &assessment)
    }

    #[tool(
        description = "Create a tracked plan for a compound request. Pass explicit tasks in order, or user_input to split on sequencing words. Returns the list with ids and a summary naming the next task."
    )]
    async fn create_todo_list(&self, param: Parameters<CreateTodoListParam>) -> Result<CallToolResult, ErrorData> {
        let args = param.0.clone().into_args().map_err(|message| {
            invalid_params_error("INVALID_TODO_TASK", message, Value::Null, "Use priority high, medium or low.")
        })?;
        let list = self.dispatcher.create_todo_list(args).map_err(|error| todo_error(&error))?;
        self.respond(
            "create_todo_list",
            &param.0,
            &json!({ "summary": list.summary(), "list": list }),
        )
    }

    #[tool(
        description = "Report progress on one todo task: status, progress percentage and an optional result payload. Completed, failed and cancelled tasks are final. Returns the task and the updated list summary."
    )]
    async fn update_todo_task(&self, param: Parameters<UpdateTodoTaskParam>) -> Result<CallToolResult, ErrorData> {
        let args = param.0.clone().into_args().map_err(|message| {
            invalid_params_error(
                "INVALID_TODO_UPDATE",
                message,
                Value::Null,
                "Use status pending, in_progress, completed, failed or cancelled.",
            )
        })?;
        let (task, list) = self.dispatcher.update_todo_task(&args).map_err(|error| todo_error(&error))?;
        self.respond(
            "update_todo_task",
            &param.0,
            &json!({ "task": task, "summary": list.summary(), "list": list }),
        )
    }

    #[tool(
        annotations(read_only_hint = true),
        description = "Return one todo list with every task and a summary naming the next pending task."
    )]
    async fn get_todo_list(&self, param: Parameters<TodoListParam>) -> Result<CallToolResult, ErrorData> {
        let list = self
            .dispatcher
            .get_todo_list(&param.0.clone().into_args())
            .map_err(|error| todo_error(&error))?;
        self.respond("get_todo_list", &param.0, &json!({ "summary": list.summary(), "list": list }))
    }

    #[tool(
        annotations(destructive_hint = true),
        description = "Discard a todo list once its plan is finished or abandoned. Returns the final state of the list; its id is unknown afterwards."
    )]
    async fn delete_todo_list(&self, param: Parameters<TodoListParam>) -> Result<CallToolResult, ErrorData> {
        let list = self
            .dispatcher
            .delete_todo_list(&param.0.clone().into_args())
            .map_err(|error| todo_error(&error))?;
        self.respond(
            "delete_todo_list",
            &param.0,
            &json!({ "deleted": true, "summary": list.summary(), "list": list }),
        )
    }

    #[tool(
        annotations(open_world_hint = true),
        description = "Plan and create a kindergarten activity with poster, marketing setup, mobile posters and a registration QR code. The first call only drafts a proposal and returns status=awaiting_confirmation with markdown to show the user; nothing is created. After the user approves, resend confirm_request unchanged. Returns every step with its status and the progress events of the run."
    )]
    async fn execute_activity_workflow(&self, param: Parameters<ActivityWorkflowParam>) -> Result<CallToolResult, ErrorData> {
        let request = param.0.clone().into_request().map_err(|message| {
            invalid_params_error(
                "INVALID_PROPOSAL",
                message,
                Value::Null,
                "Resend the proposal exactly as returned in confirm_request, or omit it to draft a new one.",
            )
        })?;
        let (events_tx, mut events_rx) = unbounded_channel();
        let outcome = self.dispatcher.execute_activity_workflow(request, Some(events_tx)).await;

        let mut events = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            self.emit_event(&event);
            events.push(event);
        }
        let mut structured = to_structured(&outcome)?;
        structured["events"] = to_structured(&events)?;
        self.respond("execute_activity_workflow", &param.0, &structured)
    }

    fn respond<P: Serialize, T: Serialize>(&self, tool_name: &str, request: &P, result: &T) -> Result<CallToolResult, ErrorData> {
        let response = CallToolResult::structured(to_structured(result)?);
        self.emit_log(
            tool_name,
            serde_json::to_value(request).ok(),
            serde_json::to_value(&response).ok(),
        );
        Ok(response)
    }

    fn emit_log(&self, tool_name: &str, request: Option<Value>, response: Option<Value>) {
        info!(tool = tool_name, "mcp tool call completed");
        let Some(sender) = self.log_sender.as_ref() else {
            return;
        };
        let payload = build_log_payload(request, response);
        let _ = sender.send(McpHttpLogEntry::new(format!("MCP HTTP: {tool_name}"), payload));
    }

    fn emit_event(&self, event: &WorkflowEvent) {
        let Some(sender) = self.log_sender.as_ref() else {
            return;
        };
        let message = match event {
            WorkflowEvent::WorkflowStepStart {
                step_title,
                step_index,
                total_steps,
                ..
            } => format!("workflow step {}/{}: {}", step_index + 1, total_steps, step_title),
            WorkflowEvent::WorkflowError { error, .. } => format!("workflow failed: {error}"),
            _ => "workflow progress".to_string(),
        };
        let _ = sender.send(McpHttpLogEntry::new(message, serde_json::to_value(event).ok()));
    }
}

#[tool_handler]
impl ServerHandler for TollgateMcpCore {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "Tollgate".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Tollgate MCP".to_string()),
                ..Default::default()
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

fn to_structured<T: Serialize>(value: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(value).map_err(|error| {
        internal_error(
            "SERIALIZATION_FAILED",
            error.to_string(),
            Value::Null,
            "Retry the call; report the failure if it persists.",
        )
    })
}

fn invalid_method(message: String) -> ErrorData {
    invalid_params_error(
        "INVALID_HTTP_METHOD",
        message,
        Value::Null,
        "Use GET, POST, PUT, PATCH or DELETE as returned by list_endpoints.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tollgate_engine::{Transport, TransportError, TransportRequest, TransportResponse};
    use tollgate_registry::{CatalogIndex, TollgateConfig};

    #[derive(Default)]
    struct CountingTransport {
        sent: Mutex<usize>,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
            *self.sent.lock().unwrap() += 1;
            Ok(TransportResponse {
                status: 200,
                body: json!({"success": true, "data": {"id": 5}}),
            })
        }
    }

    fn core(transport: Arc<CountingTransport>) -> (TollgateMcpCore, tokio::sync::mpsc::UnboundedReceiver<McpHttpLogEntry>) {
        let catalog = Arc::new(CatalogIndex::from_embedded().unwrap());
        let dispatcher = ToolDispatcher::from_config(&TollgateConfig::default(), catalog, transport, None);
        let (log_tx, log_rx) = unbounded_channel();
        (TollgateMcpCore::new(Some(log_tx), Arc::new(dispatcher)), log_rx)
    }

    fn structured(result: CallToolResult) -> Value {
        result.structured_content.unwrap()
    }

    #[tokio::test]
    async fn catalog_miss_is_returned_as_structured_data() {
        let (core, _logs) = core(Arc::new(CountingTransport::default()));
        let result = core
            .get_operation_detail(Parameters(OperationDetailParam {
                endpoint: "/api/students/7".into(),
                method: "PATCH".into(),
            }))
            .await
            .unwrap();
        let value = structured(result);
        assert_eq!(value["available_methods"], json!(["GET", "PUT", "DELETE"]));
    }

    #[tokio::test]
    async fn unconfirmed_delete_waits_and_logs() {
        let transport = Arc::new(CountingTransport::default());
        let (core, mut logs) = core(transport.clone());
        let result = core
            .execute_operation(Parameters(ExecuteOperationParam {
                endpoint: "/api/classes/3".into(),
                method: "DELETE".into(),
                query: None,
                body: None,
                confirmed: None,
            }))
            .await
            .unwrap();

        assert_eq!(structured(result)["status"], "wait_for_confirmation");
        assert_eq!(*transport.sent.lock().unwrap(), 0);
        assert_eq!(logs.try_recv().unwrap().message, "MCP HTTP: execute_operation");
    }

    #[tokio::test]
    async fn bad_method_is_invalid_params() {
        let (core, _logs) = core(Arc::new(CountingTransport::default()));
        let error = core
            .list_endpoints(Parameters(ListEndpointsParam {
                category: "学生管理".into(),
                method: Some("FETCH".into()),
            }))
            .await
            .unwrap_err();
        assert_eq!(error.data.unwrap()["error_code"], "INVALID_HTTP_METHOD");
    }

    #[tokio::test]
    async fn workflow_response_carries_progress_events() {
        let (core, _logs) = core(Arc::new(CountingTransport::default()));
        let result = core
            .execute_activity_workflow(Parameters(ActivityWorkflowParam {
                user_input: "帮我策划一个亲子运动会".into(),
                confirmed: None,
                proposal: None,
            }))
            .await
            .unwrap();
        let value = structured(result);
        assert_eq!(value["status"], "awaiting_confirmation");
        let events = value["events"].as_array().unwrap();
        assert_eq!(events[0]["type"], "workflow_start");
        assert_eq!(events.last().unwrap()["type"], "workflow_user_confirmation_required");
    }

    #[tokio::test]
    async fn todo_lists_can_be_read_and_discarded() {
        let (core, _logs) = core(Arc::new(CountingTransport::default()));
        let created = core
            .create_todo_list(Parameters(CreateTodoListParam {
                title: "迎新".into(),
                user_input: Some("首先创建班级，然后添加学生".into()),
                tasks: None,
            }))
            .await
            .unwrap();
        let list_id = structured(created)["list"]["id"].as_str().unwrap().to_string();
        let param = TodoListParam { list_id };

        let fetched = structured(core.get_todo_list(Parameters(param.clone())).await.unwrap());
        assert_eq!(fetched["summary"]["total"], 2);

        let deleted = structured(core.delete_todo_list(Parameters(param.clone())).await.unwrap());
        assert_eq!(deleted["deleted"], true);
        assert!(core.dispatcher.todos().is_empty());

        let error = core.get_todo_list(Parameters(param)).await.unwrap_err();
        assert_eq!(error.data.unwrap()["error_code"], "TODO_LIST_NOT_FOUND");
    }

    #[test]
    fn server_advertises_tools() {
        let (core, _logs) = core(Arc::new(CountingTransport::default()));
        let info = core.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("resolve_categories"));
    }
}
