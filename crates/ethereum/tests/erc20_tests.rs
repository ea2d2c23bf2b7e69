// Typed ERC-20 wrapper over a mocked transport
mod common;

use std::sync::Arc;

use ethers::types::{Bytes, Log, U256};

use bindery_ethereum::abi::{self, AbiValue};
use bindery_ethereum::contracts::{Approval, Erc20, Transfer};
use bindery_ethereum::StaticFeePolicy;

use common::{addr, address_topic, mined_receipt, MockTransport, TestSigner};

fn token(transport: MockTransport) -> Erc20 {
    Erc20::load(addr(0x70), Arc::new(transport), Arc::new(StaticFeePolicy::default())).unwrap()
}

fn returns(values: Vec<AbiValue>) -> Bytes {
    Bytes::from(abi::encode(&values).unwrap())
}

#[tokio::test]
async fn test_typed_reads() {
    let mut transport = MockTransport::new();
    transport.expect_call().returning(|request, _| {
        let selector = hex::encode(&request.data[..4]);
        let values = match selector.as_str() {
            "06fdde03" => vec![AbiValue::from("Test Token")],
            "95d89b41" => vec![AbiValue::from("TEST")],
            "313ce567" => vec![AbiValue::Uint(U256::from(18u64), 8)],
            "18160ddd" => vec![AbiValue::uint256(U256::exp10(24))],
            "70a08231" => vec![AbiValue::uint256(1000u64)],
            "dd62ed3e" => vec![AbiValue::uint256(U256::MAX)],
            other => panic!("unexpected selector {}", other),
        };
        Ok(returns(values))
    });

    let token = token(transport);
    assert_eq!(token.name().unwrap().await.unwrap(), "Test Token");
    assert_eq!(token.symbol().unwrap().await.unwrap(), "TEST");
    assert_eq!(token.decimals().unwrap().await.unwrap(), 18);
    assert_eq!(token.total_supply().unwrap().await.unwrap(), U256::exp10(24));
    assert_eq!(token.balance_of(addr(1)).unwrap().await.unwrap(), U256::from(1000u64));
    assert_eq!(token.allowance(addr(1), addr(2)).unwrap().await.unwrap(), U256::MAX);
}

#[tokio::test]
async fn test_transfer_from_submits_call_data() {
    let expected = {
        let mut data = abi::selector("transferFrom(address,address,uint256)").to_vec();
        data.extend(
            abi::encode(&[addr(1).into(), addr(2).into(), AbiValue::uint256(5u64)]).unwrap(),
        );
        data
    };

    let mut transport = MockTransport::new();
    transport
        .expect_send_transaction()
        .withf(move |submission, _, _| submission.data.to_vec() == expected)
        .times(1)
        .returning(|_, _, _| Ok(mined_receipt()));

    let token = token(transport).with_signer(Arc::new(TestSigner(addr(3))));
    token
        .transfer_from(addr(1), addr(2), U256::from(5u64))
        .unwrap()
        .await
        .unwrap();
}

#[test]
fn test_transfer_without_signer_fails() {
    let token = token(MockTransport::new());
    assert!(token.transfer(addr(1), U256::one()).is_err());
    assert!(token.approve(addr(1), U256::one()).is_err());
}

#[test]
fn test_decode_transfer_and_approval() {
    let token = token(MockTransport::new());
    let log = |signature: &str, a, b, value: u64| Log {
        address: addr(0x70),
        topics: vec![abi::topic(signature), address_topic(a), address_topic(b)],
        data: returns(vec![AbiValue::uint256(value)]),
        ..Default::default()
    };

    let transfer = token
        .decode_transfer(&log("Transfer(address,address,uint256)", addr(1), addr(2), 9))
        .unwrap();
    assert_eq!(
        transfer,
        Transfer {
            from: addr(1),
            to: addr(2),
            value: U256::from(9u64)
        }
    );

    let approval = token
        .decode_approval(&log("Approval(address,address,uint256)", addr(3), addr(4), 11))
        .unwrap();
    assert_eq!(
        approval,
        Approval {
            owner: addr(3),
            spender: addr(4),
            value: U256::from(11u64)
        }
    );

    // An Approval log is not a Transfer
    assert!(token
        .decode_transfer(&log("Approval(address,address,uint256)", addr(3), addr(4), 11))
        .is_err());
}

#[tokio::test]
async fn test_transfers_query() {
    let mut transport = MockTransport::new();
    transport
        .expect_get_logs()
        .withf(|filter| filter.topics[1].is_none() && filter.topics[2].is_some())
        .times(1)
        .returning(|_| {
            Ok(vec![Log {
                address: addr(0x70),
                topics: vec![
                    abi::topic("Transfer(address,address,uint256)"),
                    address_topic(addr(1)),
                    address_topic(addr(2)),
                ],
                data: returns(vec![AbiValue::uint256(3u64)]),
                ..Default::default()
            }])
        });

    let transfers = token(transport)
        .transfers(None, Some(addr(2)), None, None)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(
        transfers,
        vec![Transfer {
            from: addr(1),
            to: addr(2),
            value: U256::from(3u64)
        }]
    );
}
