// graphql/guard.rs - static depth and cost limits for GraphQL operations
//
// Depth counts nested field selections; top-level fields are at depth 0.
// A leaf costs `scalar_cost`, an object costs `object_cost` plus its
// children, and a list field multiplies its children by `list_factor`.
// Named fragments are measured at their spread site. Introspection
// selections are left out of both and get their own depth limit.

use std::collections::HashMap;

use async_graphql::parser::types::{
    BaseType, DocumentOperations, ExecutableDocument, FragmentDefinition, OperationDefinition,
    OperationType, Selection, SelectionSet, ServiceDocument, Type, TypeKind, TypeSystemDefinition,
};
use async_graphql::parser::{parse_query, parse_schema, Positioned};
use async_graphql::{ErrorExtensionValues, ServerError};
use serde::Serialize;
use thiserror::Error;

use crate::config::GuardConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Operation depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("Introspection depth {depth} exceeds the maximum of {max}")]
    IntrospectionTooDeep { depth: usize, max: usize },

    #[error("Operation complexity {cost} exceeds the budget of {max}")]
    TooComplex { cost: u64, max: u64 },

    #[error("Fragment '{0}' spreads itself")]
    FragmentCycle(String),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
}

impl Rejection {
    pub fn into_server_error(self) -> ServerError {
        let mut error = ServerError::new(self.to_string(), None);
        let mut extensions = ErrorExtensionValues::default();
        extensions.set("code", "VALIDATION_REJECTED");
        error.extensions = Some(extensions);
        error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    pub scalar_cost: u64,
    pub object_cost: u64,
    pub list_factor: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            scalar_cost: 1,
            object_cost: 0,
            list_factor: 10,
        }
    }
}

/// Enough for the introspection query GraphiQL sends.
pub const DEFAULT_INTROSPECTION_DEPTH: usize = 15;

/// Depth and cost of one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationMeasure {
    pub depth: usize,
    pub cost: u64,
    /// Deepest `__schema`/`__type` selection.
    pub introspection_depth: usize,
}

#[derive(Debug, Clone)]
struct FieldShape {
    type_name: String,
    list: bool,
}

/// Which fields of which types return lists, read from the schema SDL.
#[derive(Debug, Clone, Default)]
pub struct SchemaShape {
    types: HashMap<String, HashMap<String, FieldShape>>,
    query_root: String,
    mutation_root: String,
    subscription_root: String,
}

impl SchemaShape {
    pub fn from_sdl(sdl: &str) -> Result<Self, async_graphql::parser::Error> {
        let document = parse_schema(sdl)?;
        Ok(Self::from_document(&document))
    }

    fn from_document(document: &ServiceDocument) -> Self {
        let mut shape = SchemaShape {
            types: HashMap::new(),
            query_root: "Query".to_string(),
            mutation_root: "Mutation".to_string(),
            subscription_root: "Subscription".to_string(),
        };

        for definition in &document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    let schema = &schema.node;
                    if let Some(name) = &schema.query {
                        shape.query_root = name.node.to_string();
                    }
                    if let Some(name) = &schema.mutation {
                        shape.mutation_root = name.node.to_string();
                    }
                    if let Some(name) = &schema.subscription {
                        shape.subscription_root = name.node.to_string();
                    }
                }
                TypeSystemDefinition::Type(ty) => {
                    let fields = match &ty.node.kind {
                        TypeKind::Object(object) => &object.fields,
                        TypeKind::Interface(interface) => &interface.fields,
                        _ => continue,
                    };
                    let entry = shape.types.entry(ty.node.name.node.to_string()).or_default();
                    for field in fields {
                        let (type_name, list) = unwrap_type(&field.node.ty.node);
                        entry.insert(field.node.name.node.to_string(), FieldShape { type_name, list });
                    }
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }
        shape
    }

    fn root(&self, ty: OperationType) -> &str {
        match ty {
            OperationType::Query => &self.query_root,
            OperationType::Mutation => &self.mutation_root,
            OperationType::Subscription => &self.subscription_root,
        }
    }

    fn field(&self, parent: Option<&str>, name: &str) -> Option<&FieldShape> {
        self.types.get(parent?)?.get(name)
    }
}

fn unwrap_type(ty: &Type) -> (String, bool) {
    match &ty.base {
        BaseType::Named(name) => (name.to_string(), false),
        BaseType::List(inner) => (unwrap_type(inner).0, true),
    }
}

/// Rejects operations that are too deep or too expensive to run.
#[derive(Debug, Clone)]
pub struct QueryGuard {
    max_depth: usize,
    max_complexity: u64,
    max_introspection_depth: usize,
    costs: CostModel,
    shape: SchemaShape,
}

impl QueryGuard {
    pub fn new(max_depth: usize, max_complexity: u64, costs: CostModel, shape: SchemaShape) -> Self {
        Self {
            max_depth,
            max_complexity,
            max_introspection_depth: DEFAULT_INTROSPECTION_DEPTH,
            costs,
            shape,
        }
    }

    pub fn with_introspection_depth(mut self, max: usize) -> Self {
        self.max_introspection_depth = max;
        self
    }

    pub fn from_config(config: &GuardConfig, shape: SchemaShape) -> Self {
        let costs = CostModel {
            list_factor: config.list_factor,
            ..CostModel::default()
        };
        Self::new(config.max_depth, config.max_complexity, costs, shape)
            .with_introspection_depth(config.max_introspection_depth)
    }

    /// Parses `query` and checks the operation that would run.
    pub fn check_query(&self, query: &str, operation_name: Option<&str>) -> Result<(), ServerError> {
        let document = parse_query(query)?;
        self.validate(&document, operation_name)
            .map(|_| ())
            .map_err(Rejection::into_server_error)
    }

    /// Checks the named operation, or every operation when no name is given.
    /// Returns the largest depth and cost seen.
    pub fn validate(
        &self,
        document: &ExecutableDocument,
        operation_name: Option<&str>,
    ) -> Result<OperationMeasure, Rejection> {
        let operations = select_operations(document, operation_name)?;

        let mut worst = OperationMeasure::default();
        for operation in operations {
            let measure = self.measure(document, operation)?;
            if measure.depth > self.max_depth {
                return Err(Rejection::TooDeep {
                    depth: measure.depth,
                    max: self.max_depth,
                });
            }
            if measure.introspection_depth > self.max_introspection_depth {
                return Err(Rejection::IntrospectionTooDeep {
                    depth: measure.introspection_depth,
                    max: self.max_introspection_depth,
                });
            }
            if measure.cost > self.max_complexity {
                return Err(Rejection::TooComplex {
                    cost: measure.cost,
                    max: self.max_complexity,
                });
            }
            worst.depth = worst.depth.max(measure.depth);
            worst.cost = worst.cost.max(measure.cost);
            worst.introspection_depth = worst.introspection_depth.max(measure.introspection_depth);
        }
        Ok(worst)
    }

    /// Depth and cost of one operation, without applying the limits.
    pub fn measure(
        &self,
        document: &ExecutableDocument,
        operation: &OperationDefinition,
    ) -> Result<OperationMeasure, Rejection> {
        let mut walker = Walker {
            costs: self.costs,
            shape: &self.shape,
            fragments: &document.fragments,
            depth_memo: HashMap::new(),
            cost_memo: HashMap::new(),
            visiting: Vec::new(),
            introspection_depth: 0,
        };
        let root = Some(self.shape.root(operation.ty));
        let set = &operation.selection_set.node;

        let depth = walker.depth(set)?;
        let cost = walker.cost(set, root)?;
        Ok(OperationMeasure {
            depth,
            cost,
            introspection_depth: walker.introspection_depth,
        })
    }
}

fn select_operations<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<Vec<&'a OperationDefinition>, Rejection> {
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), _) => Ok(vec![&operation.node]),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(op_name, _)| op_name.as_str() == name)
            .map(|(_, operation)| vec![&operation.node])
            .ok_or_else(|| Rejection::UnknownOperation(name.to_string())),
        (DocumentOperations::Multiple(operations), None) => {
            Ok(operations.values().map(|operation| &operation.node).collect())
        }
    }
}

type Fragments = HashMap<async_graphql::Name, Positioned<FragmentDefinition>>;

/// One walk over an operation. Fragment results are memoized so repeated
/// spreads cost linear time in the document size.
struct Walker<'a> {
    costs: CostModel,
    shape: &'a SchemaShape,
    fragments: &'a Fragments,
    depth_memo: HashMap<&'a str, usize>,
    cost_memo: HashMap<&'a str, u64>,
    visiting: Vec<&'a str>,
    introspection_depth: usize,
}

impl<'a> Walker<'a> {
    fn depth(&mut self, set: &'a SelectionSet) -> Result<usize, Rejection> {
        let mut max = 0;
        for item in &set.items {
            let depth = match &item.node {
                Selection::Field(field) => {
                    let field = &field.node;
                    let children = &field.selection_set.node;
                    let depth = if children.items.is_empty() {
                        0
                    } else {
                        1 + self.depth(children)?
                    };
                    if is_introspection(field.name.node.as_str()) {
                        self.introspection_depth = self.introspection_depth.max(depth);
                        continue;
                    }
                    depth
                }
                Selection::InlineFragment(fragment) => self.depth(&fragment.node.selection_set.node)?,
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    self.fragment_depth(name)?
                }
            };
            max = max.max(depth);
        }
        Ok(max)
    }

    fn fragment_depth(&mut self, name: &'a str) -> Result<usize, Rejection> {
        if let Some(depth) = self.depth_memo.get(name) {
            return Ok(*depth);
        }
        // Unknown fragments are reported by schema validation.
        let Some(fragment) = self.fragments.get(name) else {
            return Ok(0);
        };
        self.enter(name)?;
        let depth = self.depth(&fragment.node.selection_set.node)?;
        self.visiting.pop();
        self.depth_memo.insert(name, depth);
        Ok(depth)
    }

    fn cost(&mut self, set: &'a SelectionSet, parent: Option<&str>) -> Result<u64, Rejection> {
        let mut total: u64 = 0;
        for item in &set.items {
            let cost = match &item.node {
                Selection::Field(field) => {
                    let field = &field.node;
                    let name = field.name.node.as_str();
                    if is_introspection(name) {
                        continue;
                    }
                    let shape = self.shape.field(parent, name);
                    let is_list = shape.map(|s| s.list).unwrap_or(false);
                    let child_type = shape.map(|s| s.type_name.clone());
                    let children = &field.selection_set.node;

                    let own = if children.items.is_empty() {
                        self.costs.scalar_cost
                    } else {
                        let nested = self.cost(children, child_type.as_deref())?;
                        self.costs.object_cost.saturating_add(nested)
                    };

                    if is_list {
                        own.saturating_mul(self.costs.list_factor)
                    } else {
                        own
                    }
                }
                Selection::InlineFragment(fragment) => {
                    let fragment = &fragment.node;
                    let ty = fragment
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.to_string());
                    let ty = ty.as_deref().or(parent);
                    self.cost(&fragment.selection_set.node, ty)?
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    self.fragment_cost(name)?
                }
            };
            total = total.saturating_add(cost);
        }
        Ok(total)
    }

    fn fragment_cost(&mut self, name: &'a str) -> Result<u64, Rejection> {
        if let Some(cost) = self.cost_memo.get(name) {
            return Ok(*cost);
        }
        let Some(fragment) = self.fragments.get(name) else {
            return Ok(0);
        };
        self.enter(name)?;
        let ty = fragment.node.type_condition.node.on.node.to_string();
        let cost = self.cost(&fragment.node.selection_set.node, Some(&ty))?;
        self.visiting.pop();
        self.cost_memo.insert(name, cost);
        Ok(cost)
    }

    fn enter(&mut self, name: &'a str) -> Result<(), Rejection> {
        if self.visiting.contains(&name) {
            return Err(Rejection::FragmentCycle(name.to_string()));
        }
        self.visiting.push(name);
        Ok(())
    }
}

fn is_introspection(name: &str) -> bool {
    name.starts_with("__")
}
