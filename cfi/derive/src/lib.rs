/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains CFI procedural macros. The wrapped function increments the
    CFI counter on entry; the generated wrapper decrements it on return and
    checks that it is back at the value saved before the call.

References:
    https://tf-m-user-guide.trustedfirmware.org/design_docs/tfm_physical_attack_mitigation.html
    https://github.com/rust-embedded/riscv/blob/master/src/asm.rs

--*/

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote, ToTokens};
use syn::parse_macro_input;
use syn::parse_quote;
use syn::spanned::Spanned;
use syn::{FnArg, Ident, ItemFn, Pat, PatIdent};

#[proc_macro_attribute]
pub fn cfi_mod_fn(_args: TokenStream, input: TokenStream) -> TokenStream {
    cfi_fn(true, input)
}

#[proc_macro_attribute]
pub fn cfi_impl_fn(_args: TokenStream, input: TokenStream) -> TokenStream {
    cfi_fn(false, input)
}

fn cfi_fn(mod_fn: bool, input: TokenStream) -> TokenStream {
    let item: ItemFn = parse_macro_input!(input as ItemFn);
    match expand(mod_fn, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(mod_fn: bool, mut wrapper_fn: ItemFn) -> syn::Result<TokenStream2> {
    // The counter is checked synchronously around the body
    if let Some(asyncness) = wrapper_fn.sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "CFI functions cannot be async",
        ));
    }
    if let Some(constness) = wrapper_fn.sig.constness {
        return Err(syn::Error::new(
            constness.span(),
            "CFI functions cannot be const",
        ));
    }

    let mut orig_fn = wrapper_fn.clone();
    orig_fn.sig.ident = format_ident!("__cfi_{}", wrapper_fn.sig.ident);
    orig_fn.attrs.clear();
    orig_fn.vis = syn::Visibility::Inherited;

    let fn_name = format_ident!("{}", orig_fn.sig.ident);
    let param_names = forward_params(&mut wrapper_fn);

    let fn_call = if mod_fn {
        quote!(#fn_name( #(#param_names,)* ))
    } else {
        quote!(Self::#fn_name( #(#param_names,)* ))
    };

    wrapper_fn.block.stmts = parse_quote!(
        let saved_ctr = bl1_cfi_lib::CfiCounter::read();
        bl1_cfi_lib::CfiCounter::delay();
        let ret = #fn_call;
        bl1_cfi_lib::CfiCounter::delay();
        let new_ctr = bl1_cfi_lib::CfiCounter::decrement();
        bl1_cfi_lib::CfiCounter::assert_eq(saved_ctr, new_ctr);
        ret
    );
    wrapper_fn.attrs.push(parse_quote!(#[inline(always)]));

    orig_fn.block.stmts.insert(
        0,
        parse_quote!(
            bl1_cfi_lib::CfiCounter::increment();
        ),
    );

    Ok(quote! {
        #wrapper_fn
        #orig_fn
    })
}

/// Rewrite the wrapper's parameters into plain bindings and return the
/// expressions that forward them to the original function.
///
/// `mut` and `ref` only matter inside the original body, and destructuring
/// patterns are bound to a generated name and unpacked there instead.
fn forward_params(wrapper_fn: &mut ItemFn) -> Vec<TokenStream2> {
    wrapper_fn
        .sig
        .inputs
        .iter_mut()
        .enumerate()
        .map(|(idx, input)| match input {
            FnArg::Receiver(r) => r.self_token.to_token_stream(),
            FnArg::Typed(p) => {
                let ident = match &*p.pat {
                    Pat::Ident(PatIdent {
                        ident,
                        subpat: None,
                        ..
                    }) => ident.clone(),
                    _ => Ident::new(&format!("__cfi_arg{idx}"), Span::call_site()),
                };
                *p.pat = Pat::Ident(PatIdent {
                    attrs: Vec::new(),
                    by_ref: None,
                    mutability: None,
                    ident: ident.clone(),
                    subpat: None,
                });
                ident.to_token_stream()
            }
        })
        .collect()
}
