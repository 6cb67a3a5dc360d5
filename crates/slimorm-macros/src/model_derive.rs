//! Implementation of the Model derive macro.
//!
//! Parsing produces a [`ModelDef`]; generation turns it into a
//! `slimorm_core::Model` impl. All validation that can happen at compile time
//! (unknown attributes, a second primary key, referential actions, index
//! fields that do not exist) is reported here with a span on the offending
//! tokens.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, Ident, Lit, LitInt, LitStr, Result, Type,
};

/// Parsed model definition from a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    pub name: Ident,
    /// Table name before the naming strategy.
    pub table: String,
    pub fields: Vec<ModelFieldDef>,
    pub indexes: Vec<IndexDef>,
    pub generics: syn::Generics,
}

/// Parsed attributes for a single field.
#[derive(Debug)]
pub struct ModelFieldDef {
    pub name: Ident,
    pub ty: Type,
    pub alias: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub ignore: bool,
    pub computed: bool,
    /// Explicit `nullable`; `Option<T>` fields are nullable regardless.
    pub nullable: bool,
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<String>,
    pub index: bool,
    pub unique: bool,
    pub sequence: Option<String>,
    pub json: bool,
    pub foreign_key: Option<ForeignKeyDef>,
}

#[derive(Debug)]
pub struct ForeignKeyDef {
    pub references: syn::Path,
    pub name: Option<String>,
    pub on_delete: Option<Ident>,
    pub on_update: Option<Ident>,
}

/// A struct-level `index(...)` declaration.
#[derive(Debug)]
pub struct IndexDef {
    pub fields: Vec<Ident>,
    pub unique: bool,
    pub name: Option<String>,
}

/// Parse a `DeriveInput` into a `ModelDef`.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    let mut table = None;
    let mut indexes = Vec::new();
    for attr in orm_attrs(&input.attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
            } else if meta.path.is_ident("index") {
                let mut index = IndexDef {
                    fields: Vec::new(),
                    unique: false,
                    name: None,
                };
                meta.parse_nested_meta(|inner| {
                    if inner.path.is_ident("fields") {
                        inner.parse_nested_meta(|field| {
                            let ident = field.path.get_ident().cloned().ok_or_else(|| {
                                Error::new_spanned(&field.path, "expected a field name")
                            })?;
                            index.fields.push(ident);
                            Ok(())
                        })
                    } else if inner.path.is_ident("unique") {
                        index.unique = true;
                        Ok(())
                    } else if inner.path.is_ident("name") {
                        let value: LitStr = inner.value()?.parse()?;
                        index.name = Some(value.value());
                        Ok(())
                    } else {
                        Err(Error::new_spanned(
                            &inner.path,
                            "unknown index attribute. Valid attributes are: fields, unique, name",
                        ))
                    }
                })?;
                if index.fields.is_empty() {
                    return Err(Error::new_spanned(&meta.path, "index needs fields(...)"));
                }
                indexes.push(index);
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    &meta.path,
                    format!("unknown orm attribute `{attr_name}`. Valid attributes are: table, index"),
                ));
            }
            Ok(())
        })?;
    }

    for index in &indexes {
        for ident in &index.fields {
            if !fields.iter().any(|f| f.name == *ident) {
                return Err(Error::new_spanned(
                    ident,
                    format!("index refers to unknown field `{ident}`"),
                ));
            }
        }
    }

    let mut keys = fields.iter().filter(|f| f.primary_key);
    if let (Some(_), Some(second)) = (keys.next(), keys.next()) {
        return Err(Error::new_spanned(
            &second.name,
            "only one field can be marked primary_key",
        ));
    }

    Ok(ModelDef {
        name: input.ident.clone(),
        table: table.unwrap_or_else(|| input.ident.to_string()),
        fields,
        indexes,
        generics: input.generics.clone(),
    })
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("orm"))
}

fn parse_fields(fields: &Fields) -> Result<Vec<ModelFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Model requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

fn parse_field(field: &Field) -> Result<ModelFieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut def = ModelFieldDef {
        name,
        ty: field.ty.clone(),
        alias: None,
        primary_key: false,
        auto_increment: false,
        ignore: false,
        computed: false,
        nullable: false,
        length: None,
        scale: None,
        default: None,
        index: false,
        unique: false,
        sequence: None,
        json: false,
        foreign_key: None,
    };
    let mut references = None;
    let mut fk_name = None;
    let mut on_delete = None;
    let mut on_update = None;

    for attr in orm_attrs(&field.attrs) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") {
                def.primary_key = true;
            } else if path.is_ident("auto_increment") {
                def.auto_increment = true;
            } else if path.is_ident("ignore") {
                def.ignore = true;
            } else if path.is_ident("computed") {
                def.computed = true;
            } else if path.is_ident("nullable") {
                def.nullable = true;
            } else if path.is_ident("index") {
                def.index = true;
            } else if path.is_ident("unique") {
                def.unique = true;
            } else if path.is_ident("json") {
                def.json = true;
            } else if path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                def.alias = Some(value.value());
            } else if path.is_ident("length") {
                let value: LitInt = meta.value()?.parse()?;
                def.length = Some(value.base10_parse()?);
            } else if path.is_ident("scale") {
                let value: LitInt = meta.value()?.parse()?;
                def.scale = Some(value.base10_parse()?);
            } else if path.is_ident("default") {
                let value: Lit = meta.value()?.parse()?;
                def.default = Some(default_expr(&value)?);
            } else if path.is_ident("sequence") {
                let value: LitStr = meta.value()?.parse()?;
                def.sequence = Some(value.value());
            } else if path.is_ident("references") {
                references = Some(meta.value()?.parse::<syn::Path>()?);
            } else if path.is_ident("fk_name") {
                let value: LitStr = meta.value()?.parse()?;
                fk_name = Some(value.value());
            } else if path.is_ident("on_delete") {
                let value: LitStr = meta.value()?.parse()?;
                on_delete = Some(referential_action(&value)?);
            } else if path.is_ident("on_update") {
                let value: LitStr = meta.value()?.parse()?;
                on_update = Some(referential_action(&value)?);
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown orm attribute `{attr_name}`. \
                         Valid attributes are: primary_key, auto_increment, ignore, computed, \
                         nullable, alias, length, scale, default, index, unique, sequence, json, \
                         references, fk_name, on_delete, on_update"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    match references {
        Some(references) => {
            def.foreign_key = Some(ForeignKeyDef {
                references,
                name: fk_name,
                on_delete,
                on_update,
            });
        }
        None if fk_name.is_some() || on_delete.is_some() || on_update.is_some() => {
            return Err(Error::new_spanned(
                &def.name,
                "fk_name, on_delete and on_update require `references = Model`",
            ));
        }
        None => {}
    }

    Ok(def)
}

/// SQL text of a `default = ...` literal.
fn default_expr(lit: &Lit) -> Result<String> {
    match lit {
        Lit::Str(s) => Ok(s.value()),
        Lit::Int(i) => Ok(i.base10_digits().to_string()),
        Lit::Float(f) => Ok(f.base10_digits().to_string()),
        Lit::Bool(b) => Ok(if b.value { "1" } else { "0" }.to_string()),
        _ => Err(Error::new_spanned(
            lit,
            "expected a string, number or boolean literal for default",
        )),
    }
}

/// Map an action name to its `ReferentialAction` variant.
fn referential_action(lit: &LitStr) -> Result<Ident> {
    let variant = match lit.value().trim().to_ascii_uppercase().replace('_', " ").as_str() {
        "NO ACTION" | "NOACTION" => "NoAction",
        "RESTRICT" => "Restrict",
        "CASCADE" => "Cascade",
        "SET NULL" | "SETNULL" => "SetNull",
        "SET DEFAULT" | "SETDEFAULT" => "SetDefault",
        _ => {
            return Err(Error::new_spanned(
                lit,
                "expected one of: no action, restrict, cascade, set null, set default",
            ));
        }
    };
    Ok(Ident::new(variant, lit.span()))
}

/// Check if a type is `Option<T>`.
fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

// ============================================================================
// Generation
// ============================================================================

/// Generate the `Model` trait implementation.
pub fn generate_model_impl(def: &ModelDef) -> TokenStream {
    let name = &def.name;
    let table = &def.table;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let field_defs = def.fields.iter().map(generate_field_definition);
    let accessors = def.fields.iter().map(generate_accessor);

    let composite_indexes = if def.indexes.is_empty() {
        quote! {}
    } else {
        let indexes = def.indexes.iter().map(|index| {
            let fields = index.fields.iter().map(ToString::to_string);
            let unique = index.unique;
            let named = index.name.as_ref().map(|n| quote! { .name(#n) });
            quote! {
                ::slimorm_core::CompositeIndex::new([#(#fields),*]).unique(#unique) #named
            }
        });
        quote! {
            fn composite_indexes() -> ::std::vec::Vec<::slimorm_core::CompositeIndex> {
                ::std::vec![#(#indexes),*]
            }
        }
    };

    quote! {
        impl #impl_generics ::slimorm_core::Model for #name #ty_generics #where_clause {
            const MODEL_NAME: &'static str = #table;

            fn fields() -> ::std::vec::Vec<::slimorm_core::FieldDefinition> {
                ::std::vec![#(#field_defs),*]
            }

            fn accessors() -> ::std::vec::Vec<::slimorm_core::FieldAccessor<Self>> {
                ::std::vec![#(#accessors),*]
            }

            #composite_indexes
        }
    }
}

fn generate_field_definition(field: &ModelFieldDef) -> TokenStream {
    let name_str = field.name.to_string();
    let ty = &field.ty;

    let field_type = if field.json {
        quote! { ::slimorm_core::FieldType::of::<#ty>(::slimorm_core::HostType::Json) }
    } else {
        quote! { <#ty as ::slimorm_core::SqlField>::field_type() }
    };
    let nullable = if field.nullable {
        quote! { true }
    } else if field.json {
        let option = is_option_type(ty);
        quote! { #option }
    } else {
        quote! { <#ty as ::slimorm_core::SqlField>::NULLABLE }
    };

    let mut modifiers = Vec::new();
    if let Some(alias) = &field.alias {
        modifiers.push(quote! { .alias(#alias) });
    }
    if field.primary_key {
        modifiers.push(quote! { .primary_key(true) });
    }
    if field.auto_increment {
        modifiers.push(quote! { .auto_increment(true) });
    }
    if field.ignore {
        modifiers.push(quote! { .ignore(true) });
    }
    if field.computed {
        modifiers.push(quote! { .computed(true) });
    }
    if let Some(length) = field.length {
        modifiers.push(quote! { .length(#length) });
    }
    if let Some(scale) = field.scale {
        modifiers.push(quote! { .scale(#scale) });
    }
    if let Some(default) = &field.default {
        modifiers.push(quote! { .default_value(#default) });
    }
    if field.index {
        modifiers.push(quote! { .indexed(true) });
    }
    if field.unique {
        modifiers.push(quote! { .unique(true) });
    }
    if let Some(sequence) = &field.sequence {
        modifiers.push(quote! { .sequence(#sequence) });
    }
    if let Some(fk) = &field.foreign_key {
        let references = &fk.references;
        let mut fk_tokens = quote! {
            ::slimorm_core::ForeignKeyDefinition::new(::slimorm_core::model_definition::<#references>)
        };
        if let Some(fk_name) = &fk.name {
            fk_tokens.extend(quote! { .name(#fk_name) });
        }
        if let Some(action) = &fk.on_delete {
            fk_tokens.extend(quote! { .on_delete(::slimorm_core::ReferentialAction::#action) });
        }
        if let Some(action) = &fk.on_update {
            fk_tokens.extend(quote! { .on_update(::slimorm_core::ReferentialAction::#action) });
        }
        modifiers.push(quote! { .foreign_key(#fk_tokens) });
    }

    quote! {
        ::slimorm_core::FieldDefinition::new(#name_str, #field_type)
            .nullable(#nullable)
            #(#modifiers)*
    }
}

fn generate_accessor(field: &ModelFieldDef) -> TokenStream {
    let ident = &field.name;
    let ty = &field.ty;
    if field.json {
        quote! {
            ::slimorm_core::FieldAccessor::<Self>::new(
                |m| ::slimorm_core::types::json_to_value(&m.#ident),
                |m, v| {
                    m.#ident = ::slimorm_core::types::json_from_value::<#ty>(v)?;
                    ::std::result::Result::Ok(())
                },
            )
        }
    } else {
        quote! {
            ::slimorm_core::FieldAccessor::<Self>::new(
                |m| ::slimorm_core::SqlField::to_value(&m.#ident),
                |m, v| {
                    m.#ident = <#ty as ::slimorm_core::SqlField>::from_value(v)?;
                    ::std::result::Result::Ok(())
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_is_option_type() {
        let ty: Type = parse_quote!(Option<String>);
        assert!(is_option_type(&ty));

        let ty: Type = parse_quote!(String);
        assert!(!is_option_type(&ty));
    }

    #[test]
    fn test_parse_struct_and_field_attributes() {
        let input: DeriveInput = parse_quote! {
            #[orm(table = "Posts", index(fields(author_id, views), unique, name = "ix_av"))]
            struct Post {
                #[orm(alias = "Id", auto_increment)]
                id: i64,
                #[orm(length = 200, index)]
                title: String,
                #[orm(default = 0)]
                views: i32,
                #[orm(references = Author, on_delete = "set_null", fk_name = "FK_custom")]
                author_id: Option<i64>,
                #[orm(ignore)]
                draft: bool,
            }
        };
        let def = parse_model(&input).unwrap();
        assert_eq!(def.table, "Posts");
        assert_eq!(def.fields.len(), 5);
        assert_eq!(def.fields[0].alias.as_deref(), Some("Id"));
        assert!(def.fields[0].auto_increment);
        assert_eq!(def.fields[1].length, Some(200));
        assert!(def.fields[1].index);
        assert_eq!(def.fields[2].default.as_deref(), Some("0"));
        let fk = def.fields[3].foreign_key.as_ref().unwrap();
        assert_eq!(fk.name.as_deref(), Some("FK_custom"));
        assert_eq!(fk.on_delete.as_ref().unwrap().to_string(), "SetNull");
        assert!(def.fields[4].ignore);

        assert_eq!(def.indexes.len(), 1);
        assert!(def.indexes[0].unique);
        assert_eq!(def.indexes[0].name.as_deref(), Some("ix_av"));
        assert_eq!(def.indexes[0].fields.len(), 2);
    }

    #[test]
    fn test_table_defaults_to_struct_name() {
        let input: DeriveInput = parse_quote! {
            struct Author { id: i64 }
        };
        assert_eq!(parse_model(&input).unwrap().table, "Author");
    }

    #[test]
    fn test_rejects_unknown_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Post {
                #[orm(primary)]
                id: i64,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("unknown orm attribute `primary`"));
    }

    #[test]
    fn test_rejects_second_primary_key() {
        let input: DeriveInput = parse_quote! {
            struct Pair {
                #[orm(primary_key)]
                a: i64,
                #[orm(primary_key)]
                b: i64,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("only one field"));
    }

    #[test]
    fn test_rejects_unknown_index_field() {
        let input: DeriveInput = parse_quote! {
            #[orm(index(fields(missing)))]
            struct Post { id: i64 }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("unknown field `missing`"));
    }

    #[test]
    fn test_rejects_actions_without_references() {
        let input: DeriveInput = parse_quote! {
            struct Post {
                #[orm(on_delete = "cascade")]
                author_id: i64,
            }
        };
        assert!(parse_model(&input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Post {
                #[orm(references = Author, on_delete = "explode")]
                author_id: i64,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_rejects_enums() {
        let input: DeriveInput = parse_quote! {
            enum Status { Open, Closed }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_generated_impl_mentions_model_items() {
        let input: DeriveInput = parse_quote! {
            struct Tag {
                #[orm(json)]
                labels: Vec<String>,
            }
        };
        let tokens = generate_model_impl(&parse_model(&input).unwrap()).to_string();
        assert!(tokens.contains("MODEL_NAME"));
        assert!(tokens.contains("json_to_value"));
        assert!(tokens.contains("HostType :: Json"));
        assert!(!tokens.contains("composite_indexes"));
    }
}
