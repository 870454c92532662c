//! Bridge to the declarative schema: syntax via `graphql-parser`, plus the
//! structural checks and the argument lookup the compiler needs.
//!
//! Locations refer to the pure-schema text, never to the composite source.
//!
//! Error codes emitted:
//! - E200: the pure schema does not parse
//! - E201: the pure schema is structurally invalid

use graphql_parser::schema::{
    parse_schema, Definition, EnumType, Field, InputObjectType, InputValue, InterfaceType,
    ObjectType, SchemaDefinition, Type, TypeDefinition, TypeExtension, UnionType,
};
use graphql_parser::Pos;
use indexmap::IndexMap;
use tracing::debug;

use gqlx_types::{ErrorCode, GqlxError, Location, Result};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

// ══════════════════════════════════════════════════════════════════════════════
// Model
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    fn is_input(self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject)
    }

    fn is_output(self) -> bool {
        !matches!(self, TypeKind::InputObject)
    }
}

/// A type reference: the innermost named type and the written form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub named: String,
    pub written: String,
}

impl TypeRef {
    fn from_ast(ty: &Type<'_, String>) -> Self {
        Self {
            named: named_type(ty).to_string(),
            written: ty.to_string(),
        }
    }
}

fn named_type<'t>(ty: &'t Type<'_, String>) -> &'t str {
    match ty {
        Type::NamedType(name) => name,
        Type::ListType(inner) | Type::NonNullType(inner) => named_type(inner),
    }
}

#[derive(Debug, Clone)]
pub struct InputDef {
    pub name: String,
    pub ty: TypeRef,
    pos: (usize, usize),
}

impl InputDef {
    fn from_ast(value: &InputValue<'_, String>) -> Self {
        Self {
            name: value.name.clone(),
            ty: TypeRef::from_ast(&value.value_type),
            pos: coords(value.position),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<InputDef>,
    pos: (usize, usize),
}

impl FieldDef {
    fn from_ast(field: &Field<'_, String>) -> Self {
        Self {
            name: field.name.clone(),
            ty: TypeRef::from_ast(&field.field_type),
            arguments: field.arguments.iter().map(InputDef::from_ast).collect(),
            pos: coords(field.position),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    /// Output fields of objects and interfaces.
    pub fields: Vec<FieldDef>,
    /// Fields of input objects.
    pub input_fields: Vec<InputDef>,
    /// Implemented interfaces, or the members of a union.
    pub members: Vec<String>,
    pub enum_values: Vec<String>,
    pos: (usize, usize),
}

impl TypeDef {
    fn new(name: &str, kind: TypeKind, pos: Pos) -> Self {
        Self {
            name: name.to_string(),
            kind,
            fields: Vec::new(),
            input_fields: Vec::new(),
            members: Vec::new(),
            enum_values: Vec::new(),
            pos: coords(pos),
        }
    }

    fn from_ast(definition: &TypeDefinition<'_, String>) -> Self {
        match definition {
            TypeDefinition::Scalar(scalar) => Self::new(&scalar.name, TypeKind::Scalar, scalar.position),
            TypeDefinition::Object(ObjectType {
                name,
                position,
                implements_interfaces,
                fields,
                ..
            }) => Self {
                fields: fields.iter().map(FieldDef::from_ast).collect(),
                members: implements_interfaces.clone(),
                ..Self::new(name, TypeKind::Object, *position)
            },
            TypeDefinition::Interface(InterfaceType {
                name,
                position,
                fields,
                ..
            }) => Self {
                fields: fields.iter().map(FieldDef::from_ast).collect(),
                ..Self::new(name, TypeKind::Interface, *position)
            },
            TypeDefinition::Union(UnionType {
                name,
                position,
                types,
                ..
            }) => Self {
                members: types.clone(),
                ..Self::new(name, TypeKind::Union, *position)
            },
            TypeDefinition::Enum(EnumType {
                name,
                position,
                values,
                ..
            }) => Self {
                enum_values: values.iter().map(|v| v.name.clone()).collect(),
                ..Self::new(name, TypeKind::Enum, *position)
            },
            TypeDefinition::InputObject(InputObjectType {
                name,
                position,
                fields,
                ..
            }) => Self {
                input_fields: fields.iter().map(InputDef::from_ast).collect(),
                ..Self::new(name, TypeKind::InputObject, *position)
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Root operation type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub query: String,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
    explicit: bool,
}

impl Default for Roots {
    fn default() -> Self {
        Self {
            query: "Query".to_string(),
            mutation: None,
            subscription: None,
            explicit: false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Schema
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed pure schema.
#[derive(Debug, Clone)]
pub struct Schema {
    text: String,
    types: IndexMap<String, TypeDef>,
    roots: Roots,
}

impl Schema {
    /// Parse `text` and build the type model.
    ///
    /// Fails on syntax errors, repeated type or field names and
    /// extensions of undefined types.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let document = parse_schema::<String>(&text).map_err(|err| syntax_error(&text, &err.to_string()))?;

        let mut types: IndexMap<String, TypeDef> = IndexMap::new();
        let mut roots = Roots::default();
        let mut extensions = Vec::new();

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(SchemaDefinition {
                    query,
                    mutation,
                    subscription,
                    position,
                    ..
                }) => {
                    if roots.explicit {
                        return Err(invalid(&text, coords(*position), "Must provide only one schema definition."));
                    }
                    roots = Roots {
                        query: query.clone().unwrap_or_else(|| "Query".to_string()),
                        mutation: mutation.clone(),
                        subscription: subscription.clone(),
                        explicit: true,
                    };
                }
                Definition::TypeDefinition(definition) => {
                    let def = TypeDef::from_ast(definition);
                    if types.contains_key(&def.name) || BUILTIN_SCALARS.contains(&def.name.as_str()) {
                        let message = format!("There can be only one type named \"{}\".", def.name);
                        return Err(invalid(&text, def.pos, &message));
                    }
                    types.insert(def.name.clone(), def);
                }
                Definition::TypeExtension(extension) => extensions.push(extension),
                Definition::DirectiveDefinition(_) => {}
            }
        }

        for extension in extensions {
            apply_extension(&text, &mut types, extension)?;
        }

        for def in types.values() {
            check_unique_fields(&text, def)?;
        }
        drop(document);

        debug!(types = types.len(), query = %roots.query, "parsed pure schema");
        Ok(Self { text, types, roots })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Declared argument names of `type_name.field`, in declaration order.
    ///
    /// Unknown types or fields have no arguments.
    pub fn arguments(&self, type_name: &str, field: &str) -> Vec<String> {
        self.get(type_name)
            .filter(|def| def.kind == TypeKind::Object)
            .and_then(|def| def.field(field))
            .map(|f| f.arguments.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Structural validation: root types, type references, member kinds and
    /// non-empty definitions. Stops at the first problem.
    pub fn validate(&self) -> Result<()> {
        self.check_roots()?;
        for def in self.types.values() {
            self.check_type(def)?;
        }
        Ok(())
    }

    // ── Checks ──

    fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKind::Scalar);
        }
        self.types.get(name).map(|def| def.kind)
    }

    fn check_roots(&self) -> Result<()> {
        let roots = [
            ("Query", Some(&self.roots.query)),
            ("Mutation", self.roots.mutation.as_ref()),
            ("Subscription", self.roots.subscription.as_ref()),
        ];
        for (operation, name) in roots {
            let Some(name) = name else { continue };
            match self.types.get(name) {
                Some(def) if def.kind == TypeKind::Object => {}
                Some(def) => {
                    let message = format!(
                        "{operation} root type must be Object type, it cannot be {}.",
                        def.name
                    );
                    return Err(invalid(&self.text, def.pos, &message));
                }
                None if operation == "Query" && !self.roots.explicit => {
                    return Err(invalid(&self.text, (1, 1), "Query root type must be provided."));
                }
                None => {
                    let message = format!("Unknown type \"{name}\".");
                    return Err(invalid(&self.text, (1, 1), &message));
                }
            }
        }
        Ok(())
    }

    fn check_type(&self, def: &TypeDef) -> Result<()> {
        let name = &def.name;
        match def.kind {
            TypeKind::Scalar => Ok(()),
            TypeKind::Object | TypeKind::Interface => {
                if def.fields.is_empty() {
                    let message = format!("Type {name} must define one or more fields.");
                    return Err(invalid(&self.text, def.pos, &message));
                }
                for field in &def.fields {
                    let coordinate = format!("{name}.{}", field.name);
                    self.check_ref(&field.ty, field.pos, &coordinate, false)?;
                    for arg in &field.arguments {
                        let coordinate = format!("{name}.{}({}:)", field.name, arg.name);
                        self.check_ref(&arg.ty, arg.pos, &coordinate, true)?;
                    }
                }
                self.check_interfaces(def)
            }
            TypeKind::Union => {
                if def.members.is_empty() {
                    let message = format!("Union type {name} must define one or more member types.");
                    return Err(invalid(&self.text, def.pos, &message));
                }
                for member in &def.members {
                    match self.kind_of(member) {
                        Some(TypeKind::Object) => {}
                        Some(_) => {
                            let message = format!(
                                "Union type {name} can only include Object types, it cannot include {member}."
                            );
                            return Err(invalid(&self.text, def.pos, &message));
                        }
                        None => return Err(unknown_type(&self.text, def.pos, member)),
                    }
                }
                Ok(())
            }
            TypeKind::Enum => {
                if def.enum_values.is_empty() {
                    let message = format!("Enum type {name} must define one or more values.");
                    return Err(invalid(&self.text, def.pos, &message));
                }
                Ok(())
            }
            TypeKind::InputObject => {
                if def.input_fields.is_empty() {
                    let message = format!("Input Object type {name} must define one or more fields.");
                    return Err(invalid(&self.text, def.pos, &message));
                }
                for field in &def.input_fields {
                    let coordinate = format!("{name}.{}", field.name);
                    self.check_ref(&field.ty, field.pos, &coordinate, true)?;
                }
                Ok(())
            }
        }
    }

    fn check_ref(&self, ty: &TypeRef, pos: (usize, usize), coordinate: &str, input: bool) -> Result<()> {
        let kind = self
            .kind_of(&ty.named)
            .ok_or_else(|| unknown_type(&self.text, pos, &ty.named))?;
        let (ok, expected) = if input {
            (kind.is_input(), "Input")
        } else {
            (kind.is_output(), "Output")
        };
        if ok {
            return Ok(());
        }
        let message = format!(
            "The type of {coordinate} must be {expected} Type but got: {}.",
            ty.written
        );
        Err(invalid(&self.text, pos, &message))
    }

    fn check_interfaces(&self, def: &TypeDef) -> Result<()> {
        for interface in &def.members {
            let Some(iface) = self.types.get(interface) else {
                return Err(unknown_type(&self.text, def.pos, interface));
            };
            if iface.kind != TypeKind::Interface {
                let message = format!(
                    "Type {} must only implement Interface types, it cannot implement {interface}.",
                    def.name
                );
                return Err(invalid(&self.text, def.pos, &message));
            }
            for expected in &iface.fields {
                if def.field(&expected.name).is_none() {
                    let message = format!(
                        "Interface field {interface}.{} expected but {} does not provide it.",
                        expected.name, def.name
                    );
                    return Err(invalid(&self.text, def.pos, &message));
                }
            }
        }
        Ok(())
    }
}

fn apply_extension(
    text: &str,
    types: &mut IndexMap<String, TypeDef>,
    extension: &TypeExtension<'_, String>,
) -> Result<()> {
    let (name, pos) = match extension {
        TypeExtension::Scalar(ext) => (&ext.name, ext.position),
        TypeExtension::Object(ext) => (&ext.name, ext.position),
        TypeExtension::Interface(ext) => (&ext.name, ext.position),
        TypeExtension::Union(ext) => (&ext.name, ext.position),
        TypeExtension::Enum(ext) => (&ext.name, ext.position),
        TypeExtension::InputObject(ext) => (&ext.name, ext.position),
    };
    let Some(def) = types.get_mut(name) else {
        let message = format!("Cannot extend type \"{name}\" because it is not defined.");
        return Err(invalid(text, coords(pos), &message));
    };

    match extension {
        TypeExtension::Scalar(_) => {}
        TypeExtension::Object(ext) => {
            def.fields.extend(ext.fields.iter().map(FieldDef::from_ast));
            def.members.extend(ext.implements_interfaces.iter().cloned());
        }
        TypeExtension::Interface(ext) => def.fields.extend(ext.fields.iter().map(FieldDef::from_ast)),
        TypeExtension::Union(ext) => def.members.extend(ext.types.iter().cloned()),
        TypeExtension::Enum(ext) => def.enum_values.extend(ext.values.iter().map(|v| v.name.clone())),
        TypeExtension::InputObject(ext) => {
            def.input_fields.extend(ext.fields.iter().map(InputDef::from_ast))
        }
    }
    Ok(())
}

fn check_unique_fields(text: &str, def: &TypeDef) -> Result<()> {
    let names = def
        .fields
        .iter()
        .map(|f| (&f.name, f.pos))
        .chain(def.input_fields.iter().map(|f| (&f.name, f.pos)));
    let mut seen = Vec::new();
    for (name, pos) in names {
        if seen.contains(&name) {
            let message = format!("Field \"{}.{name}\" can only be defined once.", def.name);
            return Err(invalid(text, pos, &message));
        }
        seen.push(name);
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors & positions
// ══════════════════════════════════════════════════════════════════════════════

fn coords(pos: Pos) -> (usize, usize) {
    (pos.line, pos.column)
}

/// Resolve a 1-based line/column of `text` to a location.
fn location(text: &str, (line, column): (usize, usize)) -> Location {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    // a column one past the last char, as reported at end of input, maps
    // to the end of the line
    let line_text = text
        .get(line_start..)
        .and_then(|rest| rest.split_inclusive('\n').next())
        .unwrap_or_default();
    let column_offset: usize = line_text
        .chars()
        .take(column.saturating_sub(1))
        .map(char::len_utf8)
        .sum();
    let offset = (line_start + column_offset).min(text.len());
    Location {
        line: line as u32,
        column: column as u32,
        range: [offset, offset],
    }
}

fn invalid(text: &str, pos: (usize, usize), message: &str) -> GqlxError {
    GqlxError::in_schema(
        ErrorCode::SCHEMA_INVALID,
        format!("Error in GraphQL schema: {message}"),
        location(text, pos),
    )
}

fn unknown_type(text: &str, pos: (usize, usize), name: &str) -> GqlxError {
    invalid(text, pos, &format!("Unknown type \"{name}\"."))
}

/// Turn a `graphql-parser` message into a located syntax error.
fn syntax_error(text: &str, raw: &str) -> GqlxError {
    let pos = raw
        .split("Parse error at ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|coords| coords.split_once(':'))
        .and_then(|(line, column)| Some((line.parse().ok()?, column.parse().ok()?)))
        .unwrap_or((1, 1));
    let message = raw
        .strip_prefix("schema parse error: ")
        .unwrap_or(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    GqlxError::in_schema(
        ErrorCode::SCHEMA_SYNTAX,
        format!("Error in GraphQL schema: {message}"),
        location(text, pos),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlx_types::Origin;

    fn parse(text: &str) -> Schema {
        Schema::parse(text).unwrap_or_else(|e| panic!("{e}"))
    }

    fn invalid_message(text: &str) -> String {
        let err = parse(text).validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::SCHEMA_INVALID);
        err.message
    }

    #[test]
    fn test_argument_lookup() {
        let schema = parse("type Query { a(x: Int, y: [String!]): Int b: Int }");
        assert_eq!(schema.arguments("Query", "a"), vec!["x", "y"]);
        assert!(schema.arguments("Query", "b").is_empty());
        assert!(schema.arguments("Query", "missing").is_empty());
        assert!(schema.arguments("Mutation", "a").is_empty());
    }

    #[test]
    fn test_extension_fields_are_visible() {
        let schema = parse("type Query { a: Int }\nextend type Query { b(id: ID): Int }");
        assert_eq!(schema.arguments("Query", "b"), vec!["id"]);
        schema.validate().unwrap();
    }

    #[test]
    fn test_valid_schema() {
        let text = "interface Node { id: ID! }\n\
                    type Item implements Node { id: ID! tags: [String] }\n\
                    union Found = Item\n\
                    enum Order { ASC DESC }\n\
                    input Filter { q: String order: Order }\n\
                    type Query { items(filter: Filter): [Item] found: Found }";
        parse(text).validate().unwrap();
    }

    #[test]
    fn test_syntax_error_is_located_in_pure_schema() {
        let err = Schema::parse("type Query {\n  a: \n}").unwrap_err();
        assert_eq!(err.code, ErrorCode::SCHEMA_SYNTAX);
        assert_eq!(err.origin, Origin::PureSchema);
        assert!(err.message.starts_with("Error in GraphQL schema: "));
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_location_offsets() {
        assert_eq!(location("ab\ncd", (2, 2)).range, [4, 4]);
        assert_eq!(location("abc", (1, 4)).range, [3, 3]);
        assert_eq!(location("abc", (1, 40)).range, [3, 3]);
        assert_eq!(location("é x", (1, 3)).range, [3, 3]);
    }

    #[test]
    fn test_syntax_error_at_end_of_input_has_range() {
        let text = "type Query { a: Int ";
        let err = Schema::parse(text).unwrap_err();
        assert_eq!(err.code, ErrorCode::SCHEMA_SYNTAX);
        let [start, end] = err.location.range;
        assert!(start > 0 && start <= text.len());
        assert_eq!(start, end);
    }

    #[test]
    fn test_duplicate_type() {
        let err = Schema::parse("type Query { a: Int }\ntype Query { b: Int }").unwrap_err();
        assert_eq!(
            err.message,
            "Error in GraphQL schema: There can be only one type named \"Query\"."
        );
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_duplicate_field() {
        let err = Schema::parse("type Query { a: Int a: String }").unwrap_err();
        assert_eq!(
            err.message,
            "Error in GraphQL schema: Field \"Query.a\" can only be defined once."
        );
    }

    #[test]
    fn test_missing_query_root() {
        assert_eq!(
            invalid_message("type Mutation { a: Int }"),
            "Error in GraphQL schema: Query root type must be provided."
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            invalid_message("type Query { a: Missing }"),
            "Error in GraphQL schema: Unknown type \"Missing\"."
        );
    }

    #[test]
    fn test_input_type_in_output_position() {
        assert_eq!(
            invalid_message("input In { a: Int }\ntype Query { a: [In] }"),
            "Error in GraphQL schema: The type of Query.a must be Output Type but got: [In]."
        );
    }

    #[test]
    fn test_object_type_as_argument() {
        assert_eq!(
            invalid_message("type Item { a: Int }\ntype Query { a(item: Item!): Int }"),
            "Error in GraphQL schema: The type of Query.a(item:) must be Input Type but got: Item!."
        );
    }

    #[test]
    fn test_union_members_must_be_objects() {
        assert_eq!(
            invalid_message("union U = Int\ntype Query { a: U }"),
            "Error in GraphQL schema: Union type U can only include Object types, it cannot include Int."
        );
    }

    #[test]
    fn test_interface_fields_must_be_provided() {
        assert_eq!(
            invalid_message("interface Node { id: ID }\ntype Item implements Node { a: Int }\ntype Query { a: Item }"),
            "Error in GraphQL schema: Interface field Node.id expected but Item does not provide it."
        );
    }
}
