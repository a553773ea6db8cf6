use proc_macro2::Span;
use quote::quote;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Ident, LitStr, Token};

mod kw {
    syn::custom_keyword!(exact);
    syn::custom_keyword!(prefix);
}

/// Longest token the command decoder will ever look at.
const TOKEN_MAX: usize = 19;

pub enum KeywordMatch {
    // WHOLE TOKEN
    Exact(kw::exact),
    // LEADING TEXT, REMAINDER IS THE ARGUMENT
    Prefix(kw::prefix),
}

impl Parse for KeywordMatch {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let look = input.lookahead1();
        if look.peek(kw::exact) {
            input.parse().map(Self::Exact)
        } else if look.peek(kw::prefix) {
            input.parse().map(Self::Prefix)
        } else {
            Err(look.error())
        }
    }
}

pub struct KeywordEntry {
    pub span: Span,
    pub text: LitStr,
    pub ident: Ident,
    pub kind: KeywordMatch,
}

impl KeywordEntry {
    pub fn is_prefix(&self) -> bool {
        matches!(self.kind, KeywordMatch::Prefix(_))
    }
}

impl Parse for KeywordEntry {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let left_pipe = input.parse::<Token![|]>()?;

        let text = input.parse::<LitStr>()?;
        let value = text.value();
        if value.is_empty() || value.len() > TOKEN_MAX {
            return Err(syn::Error::new(
                text.span(),
                format!("keyword must be 1 to {TOKEN_MAX} bytes long"),
            ));
        }
        if value.bytes().any(|b| b == b' ' || !b.is_ascii_graphic()) {
            return Err(syn::Error::new(
                text.span(),
                "keyword must be printable ASCII without spaces",
            ));
        }

        let ident = input.parse::<Token![|]>().and_then(|_| input.parse())?;
        let kind = input.parse::<Token![|]>().and_then(|_| input.parse())?;
        let right_pipe = input.parse::<Token![|]>()?;

        // Lossy.
        let span = quote!(#left_pipe #right_pipe).span();

        Ok(Self {
            span,
            text,
            ident,
            kind,
        })
    }
}

pub struct KeywordTable(pub Punctuated<KeywordEntry, Token![,]>);

impl Parse for KeywordTable {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let table = Punctuated::<KeywordEntry, Token![,]>::parse_terminated(input)?;

        for (i, entry) in table.iter().enumerate() {
            if let Some(first) = table.iter().take(i).find(|e| e.ident == entry.ident) {
                let mut err = syn::Error::new(entry.ident.span(), "duplicate keyword variant");
                err.combine(syn::Error::new(first.ident.span(), "first defined here"));
                return Err(err);
            }
            if table.iter().take(i).any(|e| e.text.value() == entry.text.value()) {
                return Err(syn::Error::new(entry.span, "duplicate keyword text"));
            }
        }

        Ok(Self(table))
    }
}
