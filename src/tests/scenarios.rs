// Scenarios - End-to-end behaviour of orders, dust and multisig accounts
//
// Pool BASE/USDX starts at 10/10 in every order scenario. Orders sell USDX
// for BASE, so a taker crosses them by selling BASE.

use super::support::*;
use crate::execution::{Code, Event};
use crate::state::{StateRead, StateWrite};
use crate::swap::{plan_sell, OrderId};
use crate::types::*;
use num_bigint::BigUint;

const USDX: CoinId = CoinId(1);

fn chain_with_pool() -> TestChain {
    let mut chain = TestChain::new();
    let response = chain.create_pool(&key(1), CoinId::BASE, coins(10), USDX, coins(10));
    assert!(response.is_ok(), "{:?}", response);
    chain
}

fn place_order(chain: &mut TestChain, owner: &ed25519_dalek::SigningKey, sell: Amount, buy: Amount) -> OrderId {
    chain.fund(owner, USDX, sell.clone());
    chain.fund(owner, CoinId::BASE, coins(1));
    let response = chain.submit(
        owner,
        TxData::AddLimitOrder(AddLimitOrderData {
            coin_to_sell: USDX,
            value_to_sell: sell,
            coin_to_buy: CoinId::BASE,
            value_to_buy: buy,
        }),
    );
    assert!(response.is_ok(), "{:?}", response);
    response.tag("tx.order_id").unwrap().parse().unwrap()
}

fn sell_base(amount: Amount) -> TxData {
    TxData::SellSwapPool(SellSwapPoolData {
        coins: vec![CoinId::BASE, USDX],
        value_to_sell: amount,
        minimum_value_to_buy: Amount::default(),
    })
}

mod order_crossing {
    use super::*;

    /// Order at 3 BASE per USDX: the curve is walked up to that price, the
    /// order absorbs the middle of the trade, the curve takes the rest.
    #[test]
    fn test_sell_consumes_resting_order() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        let taker = key(3);
        let order_id = place_order(&mut chain, &owner, coins(5), coins(15));

        chain.fund(&taker, CoinId::BASE, coins(30));
        let curve_only = plan_sell(&chain.state, &[CoinId::BASE, USDX], &coins(23), false).unwrap();
        let owner_base_before = chain.balance(&owner, CoinId::BASE);

        let response = chain.submit(&taker, sell_base(coins(23)));
        assert!(response.is_ok(), "{:?}", response);

        assert!(chain.state.order(order_id).is_none());
        assert_eq!(chain.balance(&owner, CoinId::BASE) - owner_base_before, coins(15));

        let received = chain.balance(&taker, USDX);
        assert_eq!(response.tag("tx.return"), Some(received.to_string().as_str()));
        assert!(received > coins(9));
        assert!(received > curve_only.amount_out);

        let pools: serde_json::Value = serde_json::from_str(response.tag("tx.pools").unwrap()).unwrap();
        assert_eq!(pools[0]["orders"][0], order_id);
        assert!(response.events.is_empty());
    }

    #[test]
    fn test_buy_partially_fills_order() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        let taker = key(3);
        let order_id = place_order(&mut chain, &owner, coins(5), coins(15));

        chain.fund(&taker, CoinId::BASE, coins(30));
        let owner_base_before = chain.balance(&owner, CoinId::BASE);
        let response = chain.submit(
            &taker,
            TxData::BuySwapPool(BuySwapPoolData {
                coins: vec![CoinId::BASE, USDX],
                value_to_buy: coins(7),
                maximum_value_to_sell: coins(23),
            }),
        );
        assert!(response.is_ok(), "{:?}", response);
        assert_eq!(chain.balance(&taker, USDX), coins(7));

        let order = chain.state.order(order_id).expect("order partially filled");
        assert!(order.want_sell > BigUint::default() && order.want_sell < coins(5));
        let paid = chain.balance(&owner, CoinId::BASE) - owner_base_before;
        assert_eq!(paid + &order.want_buy, coins(15));
    }

    #[test]
    fn test_cancel_refunds_remaining_escrow() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        let order_id = place_order(&mut chain, &owner, coins(5), coins(15));
        assert_eq!(chain.balance(&owner, USDX), BigUint::default());

        let stranger = key(4);
        chain.fund(&stranger, CoinId::BASE, coins(1));
        let response = chain.submit(&stranger, TxData::RemoveLimitOrder(RemoveLimitOrderData { id: order_id }));
        assert!(response.has_code(Code::IsNotOwnerOfOrder));

        let response = chain.submit(&owner, TxData::RemoveLimitOrder(RemoveLimitOrderData { id: order_id }));
        assert!(response.is_ok(), "{:?}", response);
        assert_eq!(chain.balance(&owner, USDX), coins(5));
        assert!(chain.state.order(order_id).is_none());

        let response = chain.submit(&owner, TxData::RemoveLimitOrder(RemoveLimitOrderData { id: order_id }));
        assert!(response.has_code(Code::OrderNotExists));
    }
}

mod order_price {
    use super::*;

    /// Selling USDX below the pool's price would hand takers a free trade
    #[test]
    fn test_order_worse_than_pool_is_rejected() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        chain.fund(&owner, USDX, coins(5));
        chain.fund(&owner, CoinId::BASE, coins(1));

        let response = chain.submit(
            &owner,
            TxData::AddLimitOrder(AddLimitOrderData {
                coin_to_sell: USDX,
                value_to_sell: coins(5),
                coin_to_buy: CoinId::BASE,
                value_to_buy: coins(4),
            }),
        );
        assert!(response.has_code(Code::WrongOrderPrice));
        assert_eq!(chain.state.orders().count(), 0);
        assert_eq!(chain.balance(&owner, USDX), coins(5));
    }

    #[test]
    fn test_order_at_pool_price_is_accepted() {
        let mut chain = chain_with_pool();
        place_order(&mut chain, &key(2), coins(5), coins(5));
        assert_eq!(chain.state.orders().count(), 1);
    }

    #[test]
    fn test_order_volume_under_dust() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        chain.fund(&owner, USDX, coins(5));
        chain.fund(&owner, CoinId::BASE, coins(1));
        let response = chain.submit(
            &owner,
            TxData::AddLimitOrder(AddLimitOrderData {
                coin_to_sell: USDX,
                value_to_sell: coins(5),
                coin_to_buy: CoinId::BASE,
                value_to_buy: BigUint::from(1_000u32),
            }),
        );
        assert!(response.has_code(Code::OrderVolumeTooSmall));
    }
}

mod order_dust {
    use super::*;

    /// Leaving 5e9 units on both sides closes the order, refunds the
    /// escrow and lets the sell complete
    #[test]
    fn test_dust_remainder_expires_order() {
        let mut chain = chain_with_pool();
        let owner = key(2);
        let taker = key(3);
        let order_id = place_order(&mut chain, &owner, coins(5), coins(5));

        let leftover = BigUint::from(5_000_000_000u64);
        let amount = coins(5) - &leftover;
        chain.fund(&taker, CoinId::BASE, coins(10));
        let owner_base_before = chain.balance(&owner, CoinId::BASE);

        let response = chain.submit(&taker, sell_base(amount.clone()));
        assert!(response.is_ok(), "{:?}", response);

        assert!(chain.state.order(order_id).is_none());
        assert_eq!(chain.balance(&taker, USDX), amount);
        assert_eq!(chain.balance(&owner, USDX), leftover);
        assert_eq!(chain.balance(&owner, CoinId::BASE) - owner_base_before, amount);
        assert_eq!(
            response.events,
            vec![Event::order_expired(order_id, &account(&owner), USDX, &leftover)]
        );
    }
}

mod multisig_votes {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn chain_with_multisig() -> (TestChain, AccountId, [SigningKey; 4]) {
        let mut chain = TestChain::new();
        let creator = key(10);
        let owners = [key(11), key(12), key(13), key(14)];
        chain.fund(&creator, CoinId::BASE, coins(1));

        let response = chain.submit(
            &creator,
            TxData::CreateMultisig(CreateMultisigData {
                threshold: 2,
                weights: vec![1, 1, 1],
                addresses: owners[..3].iter().map(account).collect(),
            }),
        );
        assert!(response.is_ok(), "{:?}", response);
        let address = AccountId::multisig(&account(&creator), 1);
        assert_eq!(response.tag("tx.created_multisig"), Some(address.to_hex().as_str()));

        chain.state.add_balance(&address, CoinId::BASE, &coins(10));
        (chain, address, owners)
    }

    fn send_from(chain: &TestChain, multisig: AccountId, signers: &[&SigningKey]) -> Vec<u8> {
        let data = TxData::Send(SendData {
            coin: CoinId::BASE,
            to: AccountId::from_bytes([42u8; 32]),
            value: coins(1),
        });
        chain
            .builder(&multisig, data)
            .sign_multi(multisig, signers)
            .and_then(|tx| tx.encode())
            .unwrap()
    }

    #[test]
    fn test_single_vote_is_not_enough() {
        let (mut chain, multisig, owners) = chain_with_multisig();
        let raw = send_from(&chain, multisig, &[&owners[0]]);
        let response = chain.deliver(&raw);
        assert!(response.has_code(Code::NotEnoughMultisigVotes));
        assert_eq!(chain.state.nonce(&multisig), 0);
    }

    #[test]
    fn test_duplicate_signer_is_rejected() {
        let (mut chain, multisig, owners) = chain_with_multisig();
        let raw = send_from(&chain, multisig, &[&owners[0], &owners[0]]);
        assert!(chain.deliver(&raw).has_code(Code::DuplicatedAddresses));
    }

    #[test]
    fn test_outsider_signature_counts_nothing() {
        let (mut chain, multisig, owners) = chain_with_multisig();
        let raw = send_from(&chain, multisig, &[&owners[0], &owners[3]]);
        assert!(chain.deliver(&raw).has_code(Code::NotEnoughMultisigVotes));
    }

    #[test]
    fn test_threshold_met_applies_once() {
        let (mut chain, multisig, owners) = chain_with_multisig();
        let recipient = AccountId::from_bytes([42u8; 32]);

        let raw = send_from(&chain, multisig, &[&owners[0], &owners[1], &owners[2]]);
        let response = chain.deliver(&raw);
        assert!(response.is_ok(), "{:?}", response);
        assert_eq!(response.tag("tx.from"), Some(multisig.to_hex().as_str()));
        assert_eq!(chain.state.balance(&recipient, CoinId::BASE), coins(1));

        assert!(chain.deliver(&raw).has_code(Code::WrongNonce));
        assert_eq!(chain.state.balance(&recipient, CoinId::BASE), coins(1));
    }

    #[test]
    fn test_more_signatures_than_owners() {
        let (mut chain, multisig, owners) = chain_with_multisig();
        let raw = send_from(&chain, multisig, &[&owners[0], &owners[1], &owners[2], &owners[3]]);
        assert!(chain.deliver(&raw).has_code(Code::IncorrectMultiSignature));
    }

    #[test]
    fn test_empty_signature_set_is_rejected() {
        let (mut chain, multisig, _) = chain_with_multisig();
        let raw = send_from(&chain, multisig, &[]);
        assert!(chain.deliver(&raw).has_code(Code::IncorrectMultiSignature));
        assert_eq!(chain.state.nonce(&multisig), 0);

        // A zero threshold in state still needs a signer
        let mut stored = chain.state.multisig(&multisig).unwrap();
        stored.threshold = 0;
        chain.state.set_multisig(stored);
        let raw = send_from(&chain, multisig, &[]);
        assert!(chain.deliver(&raw).has_code(Code::IncorrectMultiSignature));
        assert_eq!(chain.state.balance(&multisig, CoinId::BASE), coins(10));
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let mut chain = TestChain::new();
        let creator = key(10);
        chain.fund(&creator, CoinId::BASE, coins(1));

        let response = chain.submit(
            &creator,
            TxData::CreateMultisig(CreateMultisigData {
                threshold: 0,
                weights: vec![1, 1],
                addresses: vec![account(&key(11)), account(&key(12))],
            }),
        );
        assert!(response.has_code(Code::IncorrectTotalWeights));
        assert!(chain.state.multisig(&AccountId::multisig(&account(&creator), 1)).is_none());
    }

    #[test]
    fn test_unknown_multisig() {
        let (mut chain, _, owners) = chain_with_multisig();
        let ghost = AccountId::from_bytes([77u8; 32]);
        let raw = send_from(&chain, ghost, &[&owners[0], &owners[1]]);
        assert!(chain.deliver(&raw).has_code(Code::MultisigNotExists));
    }
}
