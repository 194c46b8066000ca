//! Routes `{name, arguments}` tool calls to the discovery chain, the guarded
//! executor, the planner and the activity workflow.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tollgate_registry::{CatalogIndex, CategoryResolver, SynonymTable, TollgateConfig, get_operation_detail, list_endpoints};
use tollgate_types::{
    AnalyzeComplexityArgs, CatalogMiss, CategoryResolution, ComplexityAssessment, CreateTodoListArgs,
    EndpointListing, ExecuteOperationRequest, ExecuteWorkflowRequest, ExecutionOutcome, ListEndpointsArgs,
    OperationDetail, OperationDetailArgs, ResolveCategoriesArgs, TodoList, TodoListArgs, TodoTask, ToolCall, ToolName,
    UpdateTodoTaskArgs, WorkflowEvent, WorkflowOutcome,
};
use tracing::debug;

use crate::error::{ConfigurationError, DispatchError};
use crate::executor::{GuardedExecutor, Transport};
use crate::planner::{TodoBoard, TodoError, analyze_complexity};
use crate::workflow::{TransportWorkflowDelegate, WorkflowRunner};

/// Owns one instance of every tool implementation over a shared catalog.
pub struct ToolDispatcher {
    catalog: Arc<CatalogIndex>,
    resolver: CategoryResolver,
    executor: GuardedExecutor,
    workflow: WorkflowRunner,
    todos: TodoBoard,
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<CatalogIndex>, executor: GuardedExecutor, workflow: WorkflowRunner) -> Self {
        Self {
            resolver: CategoryResolver::new(Arc::clone(&catalog)),
            catalog,
            executor,
            workflow,
            todos: TodoBoard::new(),
        }
    }

    /// Wires every tool from configuration; executor and workflow share `transport`,
    /// and the workflow creates records through the executor.
    pub fn from_config(
        config: &TollgateConfig,
        catalog: Arc<CatalogIndex>,
        transport: Arc<dyn Transport>,
        bearer_token: Option<String>,
    ) -> Self {
        let mut synonyms = SynonymTable::builtin();
        synonyms.extend(config.extra_synonyms.iter().cloned());
        let executor = GuardedExecutor::new(Arc::clone(&catalog), Arc::clone(&transport))
            .with_policy(config.confirmation_policy)
            .with_bearer_token(bearer_token.clone());
        let delegate = TransportWorkflowDelegate::new(transport, config.workflow.clone(), bearer_token)
            .with_executor(executor.clone());
        let workflow = WorkflowRunner::new(Arc::new(delegate), config.workflow.clone());

        let mut dispatcher = Self::new(catalog, executor, workflow);
        dispatcher.resolver = CategoryResolver::new(Arc::clone(&dispatcher.catalog))
            .with_synonyms(synonyms)
            .with_default_limit(config.category_limit);
        dispatcher
    }

    pub fn with_workflow(mut self, workflow: WorkflowRunner) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        &self.catalog
    }

    pub fn todos(&self) -> &TodoBoard {
        &self.todos
    }

    pub fn resolve_categories(&self, args: &ResolveCategoriesArgs) -> Result<CategoryResolution, DispatchError> {
        Ok(self.resolver.resolve(&args.keywords, args.limit)?)
    }

    pub fn list_endpoints(&self, args: &ListEndpointsArgs) -> Result<EndpointListing, CatalogMiss> {
        list_endpoints(&self.catalog, &args.category, args.method)
    }

    pub fn get_operation_detail(&self, args: &OperationDetailArgs) -> Result<OperationDetail, CatalogMiss> {
        get_operation_detail(&self.catalog, &args.endpoint, args.method)
    }

    pub async fn execute_operation(&self, request: ExecuteOperationRequest) -> Result<ExecutionOutcome, ConfigurationError> {
        self.executor.execute(request).await
    }

    pub fn analyze_task_complexity(&self, args: &AnalyzeComplexityArgs) -> ComplexityAssessment {
        analyze_complexity(&args.user_input, args.context.as_deref())
    }

    pub fn create_todo_list(&self, args: CreateTodoListArgs) -> Result<TodoList, TodoError> {
        self.todos.create(args)
    }

    pub fn update_todo_task(&self, args: &UpdateTodoTaskArgs) -> Result<(TodoTask, TodoList), TodoError> {
        self.todos.update(args)
    }

    pub fn get_todo_list(&self, args: &TodoListArgs) -> Result<TodoList, TodoError> {
        self.todos
            .get(&args.list_id)
            .ok_or_else(|| TodoError::ListNotFound(args.list_id.clone()))
    }

    /// Drops a list from the board and returns its final state.
    pub fn delete_todo_list(&self, args: &TodoListArgs) -> Result<TodoList, TodoError> {
        self.todos
            .remove(&args.list_id)
            .ok_or_else(|| TodoError::ListNotFound(args.list_id.clone()))
    }

    pub async fn execute_activity_workflow(
        &self,
        request: ExecuteWorkflowRequest,
        events: Option<UnboundedSender<WorkflowEvent>>,
    ) -> WorkflowOutcome {
        self.workflow.run(request, events).await
    }

    pub async fn dispatch(&self, call: &ToolCall) -> Result<Value, DispatchError> {
        self.dispatch_with_events(call, None).await
    }

    /// Runs one tool call; catalog misses and gated outcomes come back as data.
    ///
    /// `events` receives workflow progress when the call is `execute_activity_workflow`.
    pub async fn dispatch_with_events(
        &self,
        call: &ToolCall,
        events: Option<UnboundedSender<WorkflowEvent>>,
    ) -> Result<Value, DispatchError> {
        let tool: ToolName = call.name.parse()?;
        debug!(tool = %tool, "dispatching tool call");
        let arguments = &call.arguments;

        let value = match tool {
            ToolName::ResolveCategories => {
                serde_json::to_value(self.resolve_categories(&parse_arguments(tool, arguments)?)?)?
            }
            ToolName::ListEndpoints => match self.list_endpoints(&parse_arguments(tool, arguments)?) {
                Ok(listing) => serde_json::to_value(listing)?,
                Err(miss) => serde_json::to_value(miss)?,
            },
            ToolName::GetOperationDetail => match self.get_operation_detail(&parse_arguments(tool, arguments)?) {
                Ok(detail) => serde_json::to_value(detail)?,
                Err(miss) => serde_json::to_value(miss)?,
            },
            ToolName::ExecuteOperation => {
                serde_json::to_value(self.execute_operation(parse_arguments(tool, arguments)?).await?)?
            }
            ToolName::AnalyzeTaskComplexity => {
                serde_json::to_value(self.analyze_task_complexity(&parse_arguments(tool, arguments)?))?
            }
            ToolName::CreateTodoList => {
                let list = self.create_todo_list(parse_arguments(tool, arguments)?)?;
                json!({ "summary": list.summary(), "list": list })
            }
            ToolName::UpdateTodoTask => {
                let (task, list) = self.update_todo_task(&parse_arguments(tool, arguments)?)?;
                json!({ "task": task, "summary": list.summary(), "list": list })
            }
            ToolName::GetTodoList => {
                let list = self.get_todo_list(&parse_arguments(tool, arguments)?)?;
                json!({ "summary": list.summary(), "list": list })
            }
            ToolName::DeleteTodoList => {
                let list = self.delete_todo_list(&parse_arguments(tool, arguments)?)?;
                json!({ "deleted": true, "summary": list.summary(), "list": list })
            }
            ToolName::ExecuteActivityWorkflow => {
                let outcome = self
                    .execute_activity_workflow(parse_arguments(tool, arguments)?, events)
                    .await;
                serde_json::to_value(outcome)?
            }
        };
        Ok(value)
    }
}

/// Missing arguments are read as an empty object.
fn parse_arguments<T: DeserializeOwned>(tool: ToolName, arguments: &Value) -> Result<T, DispatchError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments.clone() };
    serde_json::from_value(arguments).map_err(|error| DispatchError::InvalidArguments {
        tool,
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::RecordingTransport;

    fn dispatcher(transport: Arc<RecordingTransport>) -> ToolDispatcher {
        let catalog = Arc::new(CatalogIndex::from_embedded().unwrap());
        ToolDispatcher::from_config(&TollgateConfig::default(), catalog, transport, None)
    }

    #[tokio::test]
    async fn unknown_tools_are_rejected() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let call = ToolCall {
            name: "click_button".into(),
            arguments: Value::Null,
        };
        assert!(matches!(dispatcher.dispatch(&call).await, Err(DispatchError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn malformed_arguments_name_the_tool() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let call = ToolCall::new(ToolName::GetOperationDetail, json!({"endpoint": "/api/classes"}));
        let error = dispatcher.dispatch(&call).await.unwrap_err();
        assert!(matches!(error, DispatchError::InvalidArguments { tool: ToolName::GetOperationDetail, .. }));
    }

    #[tokio::test]
    async fn catalog_misses_are_returned_as_data() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let call = ToolCall::new(ToolName::ListEndpoints, json!({"category": "不存在的分类"}));
        let value = dispatcher.dispatch(&call).await.unwrap();
        assert_eq!(value["next_action"], "rerun_category_resolver");
    }

    #[tokio::test]
    async fn null_arguments_resolve_all_categories() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let value = dispatcher
            .dispatch(&ToolCall::new(ToolName::ResolveCategories, Value::Null))
            .await
            .unwrap();
        assert!(!value["categories"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn todo_tools_share_one_board() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let created = dispatcher
            .dispatch(&ToolCall::new(
                ToolName::CreateTodoList,
                json!({"title": "迎新", "user_input": "首先创建班级，然后添加学生"}),
            ))
            .await
            .unwrap();
        let list_id = created["list"]["id"].as_str().unwrap();
        let task_id = created["list"]["tasks"][0]["id"].as_str().unwrap();

        let updated = dispatcher
            .dispatch(&ToolCall::new(
                ToolName::UpdateTodoTask,
                json!({"list_id": list_id, "task_id": task_id, "status": "completed"}),
            ))
            .await
            .unwrap();

        assert_eq!(updated["task"]["progress"], 100);
        assert_eq!(updated["summary"]["completed"], 1);
        assert_eq!(dispatcher.todos().len(), 1);
    }

    #[tokio::test]
    async fn deleted_todo_lists_leave_the_board() {
        let dispatcher = dispatcher(Arc::new(RecordingTransport::answering(vec![])));
        let created = dispatcher
            .dispatch(&ToolCall::new(
                ToolName::CreateTodoList,
                json!({"title": "迎新", "user_input": "首先创建班级，然后添加学生"}),
            ))
            .await
            .unwrap();
        let list_id = created["list"]["id"].as_str().unwrap().to_string();

        let fetched = dispatcher
            .dispatch(&ToolCall::new(ToolName::GetTodoList, json!({"list_id": list_id})))
            .await
            .unwrap();
        assert_eq!(fetched["summary"]["total"], 2);

        let deleted = dispatcher
            .dispatch(&ToolCall::new(ToolName::DeleteTodoList, json!({"list_id": list_id})))
            .await
            .unwrap();
        assert_eq!(deleted["deleted"], true);
        assert!(dispatcher.todos().is_empty());

        let again = dispatcher
            .dispatch(&ToolCall::new(ToolName::GetTodoList, json!({"list_id": list_id})))
            .await;
        assert!(matches!(again, Err(DispatchError::Todo(TodoError::ListNotFound(_)))));
    }

    #[tokio::test]
    async fn unconfirmed_delete_does_not_reach_the_transport() {
        let transport = Arc::new(RecordingTransport::answering(vec![]));
        let dispatcher = dispatcher(transport.clone());
        let value = dispatcher
            .dispatch(&ToolCall::new(
                ToolName::ExecuteOperation,
                json!({"endpoint": "/api/students/7", "method": "DELETE"}),
            ))
            .await
            .unwrap();
        assert_eq!(value["status"], "wait_for_confirmation");
        assert!(transport.sent().is_empty());
    }
}
