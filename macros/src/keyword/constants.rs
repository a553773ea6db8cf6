use heck::ToShoutySnakeCase;
use quote::ToTokens;
use syn::{parse_quote, Ident, ItemConst};

use super::table::KeywordTable;

pub struct KeywordConstants(pub Vec<ItemConst>);

impl From<&KeywordTable> for KeywordConstants {
    fn from(table: &KeywordTable) -> Self {
        Self(
            table
                .0
                .iter()
                .map(|entry| {
                    let text = &entry.text;
                    let ident = Ident::new(
                        &entry.ident.to_string().to_shouty_snake_case(),
                        entry.ident.span(),
                    );
                    parse_quote! {
                        pub const #ident: &str = #text;
                    }
                })
                .collect(),
        )
    }
}

impl ToTokens for KeywordConstants {
    fn to_tokens(&self, tokens: &mut proc_macro2::TokenStream) {
        for constant in &self.0 {
            constant.to_tokens(tokens);
        }
    }
}
