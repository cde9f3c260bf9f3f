use lazy_static::lazy_static;
use serde_json::{json, Map, Value};

use crate::{
    bridge::WalletHandler,
    error::WalletConnectError
};
use super::{
    CommandDefinition,
    CommandRegistry,
    ExecutorFuture,
    ParamSpec,
    ParamType::{self, BigDecimal, Boolean, Number, Object}
};

lazy_static! {
    static ref REGISTRY: CommandRegistry = CommandRegistry::new(definitions());
}

pub fn registry() -> &'static CommandRegistry {
    &REGISTRY
}

// Custom executor for logIn: switches the active wallet key instead of
// forwarding to a wallet-API operation
fn log_in<'a>(handler: &'a dyn WalletHandler, params: Map<String, Value>) -> ExecutorFuture<'a> {
    Box::pin(async move {
        let fingerprint = crate::params::fingerprint_param(params.get("fingerprint"))?
            .ok_or(WalletConnectError::MissingArgument("fingerprint"))?;

        handler.log_in(fingerprint).await?;

        Ok(json!({
            "fingerprint": fingerprint,
            "success": true
        }))
    })
}

// The full catalogue of commands accepted from paired dApps.
// Order matters only for display; lookups go through the registry map.
fn definitions() -> Vec<CommandDefinition> {
    vec![
        // Keys & wallets
        CommandDefinition::executor("logIn", log_in)
            .all_fingerprints()
            .params(vec![
                ParamSpec::required("fingerprint", Number),
            ]),
        CommandDefinition::api("getWallets")
            .wait_for_sync()
            .params(vec![
                ParamSpec::optional("includeData", Boolean).with_default(json!(false)),
            ]),
        CommandDefinition::api("getTransaction")
            .params(vec![
                ParamSpec::required("transactionId", ParamType::String),
            ]),
        CommandDefinition::api("getWalletBalance")
            .bypassable()
            .params(vec![
                ParamSpec::optional("walletId", Number).with_default(json!(1)).hidden(),
            ]),
        CommandDefinition::api("getCurrentAddress")
            .bypassable()
            .params(vec![
                ParamSpec::optional("walletId", Number).with_default(json!(1)).hidden(),
            ]),
        CommandDefinition::api("getNextAddress")
            .params(vec![
                ParamSpec::optional("walletId", Number).with_default(json!(1)).hidden(),
                ParamSpec::optional("newAddress", Boolean).with_default(json!(true)),
            ]),
        CommandDefinition::api("sendTransaction")
            .wait_for_sync()
            .params(vec![
                ParamSpec::optional("walletId", Number).with_default(json!(1)).hidden(),
                ParamSpec::required("amount", BigDecimal),
                ParamSpec::required("fee", BigDecimal),
                ParamSpec::required("address", ParamType::String),
                ParamSpec::optional("memos", Object),
                ParamSpec::optional("waitForConfirmation", Boolean),
            ]),
        CommandDefinition::api("signMessageById")
            .params(vec![
                ParamSpec::required("id", ParamType::String),
                ParamSpec::required("message", ParamType::String),
            ]),
        CommandDefinition::api("signMessageByAddress")
            .params(vec![
                ParamSpec::required("address", ParamType::String),
                ParamSpec::required("message", ParamType::String),
            ]),
        CommandDefinition::api("verifySignature")
            .params(vec![
                ParamSpec::required("message", ParamType::String),
                ParamSpec::required("pubkey", ParamType::String),
                ParamSpec::required("signature", ParamType::String),
                ParamSpec::optional("address", ParamType::String),
                ParamSpec::optional("signingMode", ParamType::String),
            ]),
        CommandDefinition::api("getSyncStatus")
            .bypassable(),

        // Offers
        CommandDefinition::api("getAllOffers")
            .params(vec![
                ParamSpec::optional("start", Number).with_default(json!(0)),
                ParamSpec::optional("end", Number).with_default(json!(10)),
                ParamSpec::optional("sortKey", ParamType::String),
                ParamSpec::optional("reverse", Boolean).with_default(json!(false)),
                ParamSpec::optional("includeMyOffers", Boolean).with_default(json!(true)),
                ParamSpec::optional("includeTakenOffers", Boolean).with_default(json!(true)),
            ]),
        CommandDefinition::api("getOffersCount"),
        CommandDefinition::api("createOfferForIds")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("offer", Object),
                ParamSpec::optional("fee", BigDecimal).with_default(json!(0)),
                ParamSpec::optional("driverDict", Object),
                ParamSpec::optional("validateOnly", Boolean).with_default(json!(false)),
                ParamSpec::optional("disableJSONFormatting", Boolean).with_default(json!(true)).hidden(),
            ]),
        CommandDefinition::api("cancelOffer")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("tradeId", ParamType::String),
                ParamSpec::required("secure", Boolean),
                ParamSpec::required("fee", BigDecimal),
            ]),
        CommandDefinition::api("checkOfferValidity")
            .params(vec![
                ParamSpec::required("offerData", ParamType::String),
            ]),
        CommandDefinition::api("takeOffer")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("offer", ParamType::String),
                ParamSpec::required("fee", BigDecimal),
            ]),
        CommandDefinition::api("getOfferSummary")
            .params(vec![
                ParamSpec::required("offerData", ParamType::String),
            ]),
        CommandDefinition::api("getOfferData")
            .params(vec![
                ParamSpec::required("offerId", ParamType::String),
            ]),
        CommandDefinition::api("getOfferRecord")
            .params(vec![
                ParamSpec::required("offerId", ParamType::String),
            ]),

        // CATs
        CommandDefinition::api("createNewCATWallet")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("amount", BigDecimal),
                ParamSpec::required("fee", BigDecimal),
            ]),
        CommandDefinition::api_as("getCATAssetId", "getAssetId")
            .params(vec![
                ParamSpec::required("walletId", Number),
            ]),
        CommandDefinition::api("spendCAT")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("walletId", Number),
                ParamSpec::required("address", ParamType::String),
                ParamSpec::required("amount", BigDecimal),
                ParamSpec::required("fee", BigDecimal),
                ParamSpec::optional("memos", Object),
                ParamSpec::optional("waitForConfirmation", Boolean),
            ]),
        CommandDefinition::api("addCATToken")
            .params(vec![
                ParamSpec::required("assetId", ParamType::String),
                ParamSpec::required("name", ParamType::String),
            ]),

        // NFTs
        CommandDefinition::api("getNFTs")
            .params(vec![
                ParamSpec::required("walletIds", Object),
                ParamSpec::optional("num", Number),
                ParamSpec::optional("startIndex", Number),
            ]),
        CommandDefinition::api("getNFTInfo")
            .params(vec![
                ParamSpec::required("coinId", ParamType::String),
            ]),
        CommandDefinition::api("mintNFT")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("walletId", Number),
                ParamSpec::optional("royaltyAddress", ParamType::String),
                ParamSpec::optional("royaltyPercentage", Number),
                ParamSpec::optional("targetAddress", ParamType::String),
                ParamSpec::required("uris", Object),
                ParamSpec::required("hash", ParamType::String),
                ParamSpec::optional("metaUris", Object),
                ParamSpec::optional("metaHash", ParamType::String),
                ParamSpec::optional("fee", BigDecimal),
            ]),
        CommandDefinition::api("transferNFT")
            .wait_for_sync()
            .params(vec![
                ParamSpec::required("walletId", Number),
                ParamSpec::required("nftCoinId", ParamType::String),
                ParamSpec::required("launcherId", ParamType::String),
                ParamSpec::required("targetAddress", ParamType::String),
                ParamSpec::required("fee", BigDecimal),
            ]),

        // Notifications
        CommandDefinition::notification("showNotification")
            .params(vec![
                ParamSpec::required("type", ParamType::String),
                ParamSpec::optional("message", ParamType::String),
                ParamSpec::optional("url", ParamType::String),
                ParamSpec::optional("offerData", ParamType::String),
            ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DispatchMode;

    #[test]
    fn test_all_commands_unique() {
        let definitions = definitions();
        let registry = CommandRegistry::new(definitions.clone());
        assert_eq!(registry.len(), definitions.len());
    }

    #[test]
    fn test_target_can_differ_from_command() {
        let registry = registry();
        let definition = registry.get("getCATAssetId").unwrap();
        match definition.mode {
            DispatchMode::WalletApi { target } => assert_eq!(target, "getAssetId"),
            _ => panic!("expected a wallet API command"),
        }
    }

    #[test]
    fn test_methods_are_prefixed() {
        let registry = registry();
        assert!(registry.methods().iter().all(|m| m.starts_with("chia_")));
        assert!(registry.methods().contains(&"chia_getSyncStatus".to_string()));
    }
}
