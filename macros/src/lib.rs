mod keyword;

use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use quote::ToTokens;
use syn::parse_macro_input;

use self::keyword::constants::KeywordConstants;
use self::keyword::matcher::KeywordEnum;
use self::keyword::table::KeywordTable;

/// Expands a `| "text" | Variant | exact |` table into a `Keyword` enum
/// plus one text constant per row.
#[proc_macro]
pub fn keyword_table(input: TokenStream1) -> TokenStream1 {
    let table: KeywordTable = parse_macro_input!(input);

    let mut output = TokenStream2::new();

    KeywordEnum(&table).to_tokens(&mut output);
    KeywordConstants::from(&table).to_tokens(&mut output);

    output.into()
}
