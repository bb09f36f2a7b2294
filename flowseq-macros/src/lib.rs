use proc_macro::TokenStream;
use proc_macro2::Span;
use proc_macro_error::{abort, proc_macro_error};
use quote::quote;
use syn::{
    parse_macro_input, punctuated::Punctuated, Expr, ItemFn, Lit, LitStr, Meta, MetaNameValue,
    ReturnType, Token,
};

const FLOW: &str = "flow";
const NAME: &str = "name";
const AFTER: &str = "after";
const BEFORE: &str = "before";

fn string_value(nv: &MetaNameValue, key: &str) -> LitStr {
    if let Expr::Lit(expr_lit) = &nv.value {
        if let Lit::Str(lit) = &expr_lit.lit {
            return lit.clone();
        }
        abort!(expr_lit, "Expected a string literal for {}", key);
    }
    abort!(nv.value, "Expected a string literal for {}", key);
}

// `after = "power, clocks"` names two predecessors
fn split_names(lit: &LitStr) -> Vec<String> {
    lit.value()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Register a function as an action of a flow.
///
/// # Attributes
/// - `flow`: flow identity the action belongs to (required).
/// - `name`: action identity, defaults to the function name.
/// - `after`: comma-separated actions that must run before this one. May repeat.
/// - `before`: comma-separated actions that must run after this one. May repeat.
///
/// # Example
/// ```rust,ignore
/// #[flowseq::action(flow = "init", after = "power", before = "uart, spi")]
/// fn clocks() {
///     // enable peripheral clocks
/// }
///
/// let flows = flowseq::FlowSet::collect(flowseq::FlowConfig::default())?;
/// let init = flows.compile("init")?;
/// init.call();
/// ```
///
/// Every annotated function linked into the binary is gathered by
/// `FlowSet::collect`; the edges are strong, so naming an action that no
/// contribution registers fails compilation of the flow.
#[proc_macro_attribute]
#[proc_macro_error]
pub fn action(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args =
        syn::parse::Parser::parse2(Punctuated::<Meta, Token![,]>::parse_terminated, attr.into())
            .unwrap_or_else(|e| abort!(e.span(), "Failed to parse action attributes: {}", e));

    let input = parse_macro_input!(item as ItemFn);
    let fn_name = &input.sig.ident;

    let mut flow: Option<LitStr> = None;
    let mut name = fn_name.to_string();
    let mut after: Vec<String> = Vec::new();
    let mut before: Vec<String> = Vec::new();

    for meta in &attr_args {
        let Meta::NameValue(nv) = meta else {
            abort!(meta, "Expected `key = \"value\"` action attributes");
        };
        if nv.path.is_ident(FLOW) {
            flow = Some(string_value(nv, FLOW));
        } else if nv.path.is_ident(NAME) {
            name = string_value(nv, NAME).value();
        } else if nv.path.is_ident(AFTER) {
            after.extend(split_names(&string_value(nv, AFTER)));
        } else if nv.path.is_ident(BEFORE) {
            before.extend(split_names(&string_value(nv, BEFORE)));
        } else {
            abort!(
                nv.path,
                "Unknown action attribute; expected one of flow, name, after, before"
            );
        }
    }

    let flow = flow.unwrap_or_else(|| {
        abort!(
            Span::call_site(),
            "Missing required 'flow' attribute for action"
        )
    });

    if let Some(token) = &input.sig.asyncness {
        abort!(token, "Flow actions run synchronously and cannot be async");
    }
    if !input.sig.inputs.is_empty() {
        abort!(input.sig.inputs, "Flow actions take no arguments");
    }
    if !input.sig.generics.params.is_empty() {
        abort!(input.sig.generics, "Flow actions cannot be generic");
    }
    if let ReturnType::Type(_, ty) = &input.sig.output {
        abort!(ty, "Flow actions cannot return a value");
    }
    if after.iter().chain(before.iter()).any(|other| *other == name) {
        abort!(
            fn_name,
            "Action '{}' cannot be ordered relative to itself",
            name
        );
    }

    let expanded = quote! {
        #input

        const _: () = {
            fn __contribute(
                graph: &mut ::flowseq::Graph,
            ) -> ::flowseq::Result<()> {
                graph.register(::flowseq::Action::new(#name, #fn_name))?;
                #( graph.add_edge(#after, #name)?; )*
                #( graph.add_edge(#name, #before)?; )*
                ::core::result::Result::Ok(())
            }

            #[::flowseq::linkme::distributed_slice(::flowseq::CONTRIBUTIONS)]
            #[linkme(crate = ::flowseq::linkme)]
            static __CONTRIBUTION: ::flowseq::Contribution = ::flowseq::Contribution {
                flow: #flow,
                location: ::core::concat!(::core::file!(), ":", ::core::line!()),
                contribute: __contribute,
            };
        };
    };

    TokenStream::from(expanded)
}
