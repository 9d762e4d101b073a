use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, PatType,
    ReturnType, Type, TypePath, Visibility, parse_macro_input, spanned::Spanned,
};

#[proc_macro_derive(Entity, attributes(entity, accessor))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_attribute]
pub fn entity_methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[entity_methods] does not accept arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as ItemImpl);
    match expand_entity_methods(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_entity(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Entity)] does not support generic structs",
        ));
    }

    let options = parse_entity_options(&input.attrs)?;
    let class_name = options.class.unwrap_or_else(|| ident.to_string());

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "#[derive(Entity)] can only be used on structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new(
            data.fields.span(),
            "#[derive(Entity)] requires named fields",
        ));
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let field_options = parse_field_options(&field.attrs)?;
        if field_options.skip {
            if field_options.accessor.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "#[entity(skip)] cannot be combined with #[accessor(...)]",
                ));
            }
            continue;
        }
        let Some(field_ident) = field.ident.clone() else {
            continue;
        };
        let property = field_options
            .name
            .unwrap_or_else(|| field_ident.to_string());
        fields.push(EntityField {
            ident: field_ident,
            property,
            accessor: field_options.accessor,
        });
    }

    let properties = fields.iter().map(|f| f.property.as_str());

    let read_arms = fields.iter().map(|f| {
        let property = f.property.as_str();
        let field_ident = &f.ident;
        quote! {
            #property => ::std::option::Option::Some(
                ::entity_access::IntoValue::into_value(::std::clone::Clone::clone(&self.#field_ident))
            ),
        }
    });

    let write_arms = fields.iter().map(|f| {
        let property = f.property.as_str();
        let field_ident = &f.ident;
        quote! {
            #property => ::std::option::Option::Some(
                match ::entity_access::FromValue::from_value(value) {
                    ::std::result::Result::Ok(converted) => {
                        self.#field_ident = converted;
                        ::std::result::Result::Ok(())
                    }
                    ::std::result::Result::Err(mismatch) => {
                        ::std::result::Result::Err(::entity_access::AccessError::UnexpectedValue {
                            class: #class_name.to_string(),
                            property: #property.to_string(),
                            expected: mismatch.expected,
                        })
                    }
                }
            ),
        }
    });

    let override_arms = fields.iter().filter_map(|f| {
        let accessor = f.accessor.as_ref()?;
        let property = f.property.as_str();
        let slot = |value: &Option<String>| match value {
            Some(method) => quote!(::std::option::Option::Some(#method.to_string())),
            None => quote!(::std::option::Option::None),
        };
        let add = slot(&accessor.add);
        let remove = slot(&accessor.remove);
        let set = slot(&accessor.set);
        let get = slot(&accessor.get);
        Some(quote! {
            #property => ::std::option::Option::Some(::entity_access::AccessorOverride {
                add: #add,
                remove: #remove,
                set: #set,
                get: #get,
            }),
        })
    });

    let method_dispatch = if options.methods {
        quote! {
            fn has_method(&self, name: &str) -> bool {
                Self::__entity_access_has_method(name)
            }

            fn call_method(
                &mut self,
                this: &::entity_access::EntityRef,
                name: &str,
                args: ::std::vec::Vec<::entity_access::Value>,
            ) -> ::std::option::Option<::entity_access::Result<::entity_access::Value>> {
                self.__entity_access_call_method(this, name, args)
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        impl ::entity_access::Entity for #ident {
            fn class_name(&self) -> &str {
                #class_name
            }

            fn declared_properties(&self) -> &'static [&'static str] {
                &[#(#properties),*]
            }

            fn read_field(&self, field: &str) -> ::std::option::Option<::entity_access::Value> {
                match field {
                    #(#read_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            fn write_field(
                &mut self,
                field: &str,
                value: ::entity_access::Value,
            ) -> ::std::option::Option<::entity_access::Result<()>> {
                match field {
                    #(#write_arms)*
                    _ => {
                        let _ = value;
                        ::std::option::Option::None
                    }
                }
            }

            fn declared_override(
                &self,
                property: &str,
            ) -> ::std::option::Option<::entity_access::AccessorOverride> {
                match property {
                    #(#override_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            #method_dispatch

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    })
}

fn expand_entity_methods(item_impl: ItemImpl) -> syn::Result<TokenStream2> {
    if item_impl.trait_.is_some() {
        return Err(syn::Error::new(
            item_impl.span(),
            "#[entity_methods] can only be used on inherent impl blocks",
        ));
    }
    let self_ident = extract_impl_self_type_ident(&item_impl.self_ty)?;
    let self_ty = &item_impl.self_ty;

    let mut methods = Vec::new();
    for item in &item_impl.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        if !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        if let Some(dispatch) = DispatchMethod::from_impl_method(method)? {
            methods.push(dispatch);
        }
    }

    let names = methods.iter().map(|m| m.name.clone()).collect::<Vec<_>>();
    let has_method_body = if names.is_empty() {
        quote!({
            let _ = name;
            false
        })
    } else {
        quote!(matches!(name, #(#names)|*))
    };

    let class_label = self_ident.to_string();
    let call_arms = methods.iter().map(|m| m.build_call_arm(&class_label));

    Ok(quote! {
        #item_impl

        impl #self_ty {
            #[doc(hidden)]
            pub fn __entity_access_has_method(name: &str) -> bool {
                #has_method_body
            }

            #[doc(hidden)]
            #[allow(unused_mut, unused_variables)]
            pub fn __entity_access_call_method(
                &mut self,
                __this: &::entity_access::EntityRef,
                name: &str,
                args: ::std::vec::Vec<::entity_access::Value>,
            ) -> ::std::option::Option<::entity_access::Result<::entity_access::Value>> {
                match name {
                    #(#call_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

#[derive(Default)]
struct EntityOptions {
    class: Option<String>,
    methods: bool,
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    name: Option<String>,
    accessor: Option<AccessorOptions>,
}

#[derive(Default)]
struct AccessorOptions {
    add: Option<String>,
    remove: Option<String>,
    set: Option<String>,
    get: Option<String>,
}

struct EntityField {
    ident: Ident,
    property: String,
    accessor: Option<AccessorOptions>,
}

struct DispatchArg {
    ident: Ident,
    ty: Type,
}

enum DispatchReturnKind {
    Unit,
    Plain,
    RustResult,
}

impl DispatchReturnKind {
    fn from_signature(signature: &syn::Signature) -> Self {
        match &signature.output {
            ReturnType::Default => Self::Unit,
            ReturnType::Type(_, ty) if is_result_type(ty) => Self::RustResult,
            ReturnType::Type(..) => Self::Plain,
        }
    }
}

struct DispatchMethod {
    ident: Ident,
    name: String,
    /// Leading `this: EntityRef` parameter, filled with the accessed handle.
    takes_handle: bool,
    args: Vec<DispatchArg>,
    return_kind: DispatchReturnKind,
}

impl DispatchMethod {
    /// `None` for associated functions without a receiver.
    fn from_impl_method(method: &ImplItemFn) -> syn::Result<Option<Self>> {
        let mut inputs = method.sig.inputs.iter();
        let Some(FnArg::Receiver(receiver)) = inputs.next() else {
            return Ok(None);
        };
        if receiver.reference.is_none() {
            return Err(syn::Error::new(
                receiver.span(),
                "#[entity_methods] methods must take `&self` or `&mut self`",
            ));
        }
        if method.sig.asyncness.is_some() {
            return Err(syn::Error::new(
                method.sig.span(),
                "#[entity_methods] methods must be synchronous",
            ));
        }
        if !method.sig.generics.params.is_empty() {
            return Err(syn::Error::new(
                method.sig.generics.span(),
                "#[entity_methods] methods cannot have generic parameters",
            ));
        }

        let mut takes_handle = false;
        let mut args = Vec::new();
        for (position, input) in inputs.enumerate() {
            let FnArg::Typed(PatType { pat, ty, .. }) = input else {
                return Err(syn::Error::new(input.span(), "Unsupported argument pattern"));
            };
            let Pat::Ident(pat_ident) = pat.as_ref() else {
                return Err(syn::Error::new(
                    pat.span(),
                    "#[entity_methods] arguments must be simple identifiers",
                ));
            };
            if matches!(ty.as_ref(), Type::Reference(_)) {
                return Err(syn::Error::new(
                    ty.span(),
                    "#[entity_methods] arguments must be owned types convertible from Value",
                ));
            }
            if position == 0 && pat_ident.ident == "this" {
                if !is_entity_ref_type(ty) {
                    return Err(syn::Error::new(
                        ty.span(),
                        "#[entity_methods] `this` parameter must have type `EntityRef`",
                    ));
                }
                takes_handle = true;
                continue;
            }
            args.push(DispatchArg {
                ident: format_ident!("__arg_{}", pat_ident.ident),
                ty: (**ty).clone(),
            });
        }

        Ok(Some(Self {
            ident: method.sig.ident.clone(),
            name: method.sig.ident.to_string(),
            takes_handle,
            args,
            return_kind: DispatchReturnKind::from_signature(&method.sig),
        }))
    }

    fn build_call_arm(&self, class_label: &str) -> TokenStream2 {
        let name = self.name.as_str();
        let method_ident = &self.ident;
        let handle = if self.takes_handle {
            quote!(::std::clone::Clone::clone(__this),)
        } else {
            quote!()
        };
        let arg_idents = self.args.iter().map(|arg| &arg.ident).collect::<Vec<_>>();
        let conversions = self.args.iter().map(|arg| {
            let ident = &arg.ident;
            let ty = &arg.ty;
            quote! {
                let #ident: #ty = ::entity_access::FromValue::from_value(
                    __args.next().unwrap_or(::entity_access::Value::Null),
                )
                .map_err(|mismatch| ::entity_access::AccessError::method_call(#class_label, #name, mismatch))?;
            }
        });
        let call = quote!(self.#method_ident(#handle #(#arg_idents),*));
        let finish = match self.return_kind {
            DispatchReturnKind::Unit => quote! {
                #call;
                ::std::result::Result::Ok(::entity_access::Value::Null)
            },
            DispatchReturnKind::Plain => quote! {
                ::std::result::Result::Ok(::entity_access::IntoValue::into_value(#call))
            },
            DispatchReturnKind::RustResult => quote! {
                ::std::result::Result::Ok(::entity_access::IntoValue::into_value(#call?))
            },
        };

        quote! {
            #name => ::std::option::Option::Some(
                (|| -> ::entity_access::Result<::entity_access::Value> {
                    let mut __args = args.into_iter();
                    #(#conversions)*
                    #finish
                })()
            ),
        }
    }
}

fn parse_entity_options(attrs: &[syn::Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("class") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.class = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("methods") {
                options.methods = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[entity(...)] option on struct. Supported: class = \"...\", methods",
            ))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let lit: LitStr = value.parse()?;
                    options.name = Some(lit.value());
                    return Ok(());
                }

                Err(meta.error(
                    "Unsupported #[entity(...)] option on field. Supported: skip, name = \"...\"",
                ))
            })?;
            continue;
        }

        if !attr.path().is_ident("accessor") {
            continue;
        }
        if options.accessor.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "Duplicate #[accessor(...)] attribute on field",
            ));
        }

        let mut accessor = AccessorOptions::default();
        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("add") {
                &mut accessor.add
            } else if meta.path.is_ident("remove") {
                &mut accessor.remove
            } else if meta.path.is_ident("set") {
                &mut accessor.set
            } else if meta.path.is_ident("get") {
                &mut accessor.get
            } else {
                return Err(meta.error(
                    "Unsupported #[accessor(...)] option. Supported: add, remove, set, get = \"method\"",
                ));
            };
            let value = meta.value()?;
            let lit: LitStr = value.parse()?;
            *slot = Some(lit.value());
            Ok(())
        })?;
        options.accessor = Some(accessor);
    }

    Ok(options)
}

fn is_result_type(ty: &Type) -> bool {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return false;
    };
    path.segments
        .last()
        .map(|segment| segment.ident == "Result")
        .unwrap_or(false)
}

fn is_entity_ref_type(ty: &Type) -> bool {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return false;
    };
    path.segments
        .last()
        .is_some_and(|segment| segment.ident == "EntityRef")
}

fn extract_impl_self_type_ident(self_ty: &Type) -> syn::Result<Ident> {
    let Type::Path(TypePath { qself: None, path }) = self_ty else {
        return Err(syn::Error::new(
            self_ty.span(),
            "#[entity_methods] requires a concrete struct type",
        ));
    };

    let Some(segment) = path.segments.last() else {
        return Err(syn::Error::new(
            self_ty.span(),
            "Unable to extract impl self type identifier",
        ));
    };

    Ok(segment.ident.clone())
}
