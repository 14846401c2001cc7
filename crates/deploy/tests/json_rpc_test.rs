//! Transport tests for chainship-deploy.
//!
//! A minimal JSON-RPC node is served from a local TCP listener; each test scripts its answers
//! per method and inspects the requests it received.
//! Run with: cargo test --test json_rpc_test

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256, address, b256, keccak256};
use chainship_deploy::{
    ConfirmationError, ConstructorArgs, DeploymentExecutor, DeploymentRequest, FailureStage,
    GasPricePolicy, HardhatArtifact, JsonRpcLedger, LegacyCreation, Ledger, LocalKeyIdentity,
    NetworkProfile, SigningIdentity, TransactionHandle, UnlockedIdentity,
};
use k256::ecdsa::SigningKey;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
const TX_HASH: B256 = b256!("88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b");

// First development account of Hardhat and Anvil.
const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const PROJECT_ARTIFACT: &str = r#"{
    "contractName": "Project",
    "abi": [],
    "bytecode": "0x6080604052348015600f57600080fd5b50"
}"#;

type Handler = dyn Fn(&str, &[Value]) -> Result<Value, Value> + Send + Sync;

/// A scripted JSON-RPC node answering one request per connection.
struct StubNode {
    url: Url,
    requests: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl StubNode {
    async fn start(
        handler: impl Fn(&str, &[Value]) -> Result<Value, Value> + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&handler), Arc::clone(&log)));
            }
        });

        Self { url, requests }
    }

    fn ledger(&self) -> JsonRpcLedger {
        JsonRpcLedger::new(self.url.clone())
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    fn requests(&self) -> Vec<(String, Vec<Value>)> {
        self.requests.lock().unwrap().clone()
    }

    fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|(method, _)| method).collect()
    }

    fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    fn params(&self, method: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params)
            .unwrap_or_else(|| panic!("no {} request", method))
    }
}

async fn serve(
    mut stream: TcpStream,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
) {
    let Some(body) = read_request_body(&mut stream).await else {
        return;
    };
    let request: Value = serde_json::from_slice(&body).unwrap();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].as_array().cloned().unwrap_or_default();
    log.lock().unwrap().push((method.clone(), params.clone()));

    let response = match handler(&method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
    }
    .to_string();

    let http = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.len(),
        response
    );
    stream.write_all(http.as_bytes()).await.ok();
    stream.shutdown().await.ok();
}

async fn read_request_body(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(buf[header_end..header_end + length].to_vec())
}

fn mined_receipt(status: &str) -> Value {
    json!({
        "transactionHash": TX_HASH,
        "blockNumber": "0x2a",
        "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
        "gasUsed": "0xe7ef0",
        "status": status,
        "logs": []
    })
}

fn handle() -> TransactionHandle {
    TransactionHandle {
        hash: TX_HASH,
        nonce: None,
    }
}

fn unknown(method: &str) -> Result<Value, Value> {
    Err(json!({ "code": -32601, "message": format!("method {} not found", method) }))
}

#[tokio::test]
async fn test_confirmation_polls_until_mined() {
    let polls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&polls);
    let node = StubNode::start(move |method, _| match method {
        "eth_getTransactionReceipt" => {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(Value::Null)
            } else {
                Ok(mined_receipt("0x1"))
            }
        }
        other => unknown(other),
    })
    .await;

    let receipt = node
        .ledger()
        .await_confirmation(&handle(), Duration::from_secs(5), 1)
        .await
        .unwrap();

    assert_eq!(receipt.transaction_hash, TX_HASH);
    assert_eq!(receipt.block_number, Some(42));
    assert_eq!(receipt.status, Some(true));
    assert_eq!(node.count("eth_getTransactionReceipt"), 3);
    assert_eq!(node.params("eth_getTransactionReceipt"), vec![json!(TX_HASH)]);
    // A single confirmation never needs the chain head.
    assert_eq!(node.count("eth_blockNumber"), 0);
}

#[tokio::test]
async fn test_confirmation_waits_for_depth() {
    // The head advances by one block per query, starting at the inclusion block.
    let head = Arc::new(AtomicU64::new(42));
    let chain = Arc::clone(&head);
    let node = StubNode::start(move |method, _| match method {
        "eth_getTransactionReceipt" => Ok(mined_receipt("0x1")),
        "eth_blockNumber" => Ok(json!(format!("0x{:x}", chain.fetch_add(1, Ordering::SeqCst)))),
        other => unknown(other),
    })
    .await;

    let receipt = node
        .ledger()
        .await_confirmation(&handle(), Duration::from_secs(5), 3)
        .await
        .unwrap();

    assert_eq!(receipt.block_number, Some(42));
    // Blocks 42 and 43 are too shallow; 44 makes three confirmations.
    assert_eq!(node.count("eth_blockNumber"), 3);
}

#[tokio::test]
async fn test_confirmation_times_out() {
    let node = StubNode::start(|method, _| match method {
        "eth_getTransactionReceipt" => Ok(Value::Null),
        other => unknown(other),
    })
    .await;

    let result = node
        .ledger()
        .await_confirmation(&handle(), Duration::from_millis(100), 1)
        .await;

    assert!(
        matches!(result, Err(ConfirmationError::Timeout { hash, .. }) if hash == TX_HASH),
        "{:?}",
        result
    );
    assert!(node.count("eth_getTransactionReceipt") > 1);
}

#[tokio::test]
async fn test_reverted_receipt() {
    let node = StubNode::start(|method, _| match method {
        "eth_getTransactionReceipt" => Ok(mined_receipt("0x0")),
        other => unknown(other),
    })
    .await;

    let result = node
        .ledger()
        .await_confirmation(&handle(), Duration::from_secs(5), 1)
        .await;

    assert!(
        matches!(
            result,
            Err(ConfirmationError::Reverted {
                block_number: Some(42),
                ..
            })
        ),
        "{:?}",
        result
    );
}

#[tokio::test]
async fn test_transport_errors_are_not_retried() {
    let node = StubNode::start(|method, _| match method {
        "eth_getTransactionReceipt" => Err(json!({ "code": -32603, "message": "internal error" })),
        other => unknown(other),
    })
    .await;

    let result = node
        .ledger()
        .await_confirmation(&handle(), Duration::from_secs(5), 1)
        .await;

    let Err(ConfirmationError::Transport(error)) = &result else {
        panic!("expected a transport error, got {:?}", result);
    };
    assert!(format!("{:#}", error).contains("internal error (code -32603)"));
    assert_eq!(node.count("eth_getTransactionReceipt"), 1);
}

#[tokio::test]
async fn test_malformed_contract_address_fails_address_resolution() {
    let node = StubNode::start(|method, params| match method {
        "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
        "eth_estimateGas" => Ok(json!("0xf4240")),
        "eth_sendTransaction" => {
            assert_eq!(params[0]["gas"], json!("0x124f80"));
            Ok(json!(TX_HASH))
        }
        "eth_getTransactionReceipt" => {
            let mut receipt = mined_receipt("0x1");
            receipt["contractAddress"] = json!("0xnot-an-address");
            Ok(receipt)
        }
        other => unknown(other),
    })
    .await;

    let network = NetworkProfile::new("localhost", 1337, Some(node.url.clone()))
        .with_timeout(Duration::from_secs(5));
    let executor = DeploymentExecutor::new(node.ledger());
    let identity = UnlockedIdentity::new(DEPLOYER, node.ledger());
    let artifact = HardhatArtifact::from_json(PROJECT_ARTIFACT).unwrap();
    let request = DeploymentRequest::new(artifact, network, identity, ConstructorArgs::default());

    let outcome = executor.run(&request).await;

    assert_eq!(outcome.failed_stage(), Some(FailureStage::AddressResolution));
    assert_eq!(node.count("eth_call"), 0);
}

#[tokio::test]
async fn test_local_key_identity_signs_and_sends_raw_transaction() {
    let node = StubNode::start(|method, params| match method {
        "eth_getTransactionCount" => Ok(json!("0x5")),
        "eth_gasPrice" => Ok(json!("0x3b9aca00")),
        "eth_sendRawTransaction" => {
            let raw = Bytes::from_str(params[0].as_str().unwrap()).unwrap();
            Ok(json!(keccak256(&raw)))
        }
        other => unknown(other),
    })
    .await;

    let identity =
        LocalKeyIdentity::from_private_key(DEV_KEY, 1337, GasPricePolicy::Node, node.ledger())
            .unwrap();
    let payload = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]);

    let handle = identity.authorize_and_submit(&payload, 1_200_000).await.unwrap();

    assert_eq!(
        node.methods(),
        vec!["eth_getTransactionCount", "eth_gasPrice", "eth_sendRawTransaction"]
    );
    let nonce_params = node.params("eth_getTransactionCount");
    assert_eq!(Address::from_str(nonce_params[0].as_str().unwrap()).unwrap(), DEPLOYER);
    assert_eq!(nonce_params[1], json!("pending"));

    let key = SigningKey::from_slice(&alloy_core::hex::decode(DEV_KEY).unwrap()).unwrap();
    let expected = LegacyCreation {
        nonce: 5,
        gas_price: U256::from(1_000_000_000u64),
        gas_limit: 1_200_000,
        value: U256::ZERO,
        data: payload,
        chain_id: 1337,
    }
    .sign(&key)
    .unwrap();

    assert_eq!(node.params("eth_sendRawTransaction"), vec![json!(expected.raw)]);
    assert_eq!(handle.hash, expected.hash);
    assert_eq!(handle.nonce, Some(5));
}

#[tokio::test]
async fn test_local_key_identity_with_fixed_gas_price() {
    let node = StubNode::start(|method, _| match method {
        "eth_getTransactionCount" => Ok(json!("0x0")),
        "eth_sendRawTransaction" => Ok(json!(TX_HASH)),
        other => unknown(other),
    })
    .await;

    let identity = LocalKeyIdentity::from_private_key(
        DEV_KEY,
        1337,
        GasPricePolicy::Fixed(20_000_000_000),
        node.ledger(),
    )
    .unwrap();

    identity
        .authorize_and_submit(&Bytes::from_static(&[0x60, 0x80]), 60_000)
        .await
        .unwrap();

    assert_eq!(
        node.methods(),
        vec!["eth_getTransactionCount", "eth_sendRawTransaction"]
    );
}

#[tokio::test]
async fn test_rejected_raw_transaction() {
    let node = StubNode::start(|method, _| match method {
        "eth_getTransactionCount" => Ok(json!("0x0")),
        "eth_gasPrice" => Ok(json!("0x3b9aca00")),
        "eth_sendRawTransaction" => Err(json!({
            "code": -32000,
            "message": "insufficient funds for gas * price + value"
        })),
        other => unknown(other),
    })
    .await;

    let identity =
        LocalKeyIdentity::from_private_key(DEV_KEY, 1337, GasPricePolicy::Node, node.ledger())
            .unwrap();

    let error = identity
        .authorize_and_submit(&Bytes::from_static(&[0x60, 0x80]), 60_000)
        .await
        .unwrap_err();

    let message = format!("{:#}", error);
    assert!(message.contains("eth_sendRawTransaction was rejected"), "{}", message);
    assert!(message.contains("insufficient funds"), "{}", message);
}

#[tokio::test]
async fn test_unlocked_identity_sends_transaction() {
    let node = StubNode::start(|method, _| match method {
        "eth_accounts" => Ok(json!([DEPLOYER])),
        "eth_sendTransaction" => Ok(json!(TX_HASH)),
        other => unknown(other),
    })
    .await;

    let identity = UnlockedIdentity::first_account(node.ledger()).await.unwrap();
    assert_eq!(identity.address(), DEPLOYER);

    let payload = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]);
    let handle = identity.authorize_and_submit(&payload, 1_200_000).await.unwrap();

    assert_eq!(handle.hash, TX_HASH);
    assert_eq!(handle.nonce, None);

    let transaction = &node.params("eth_sendTransaction")[0];
    assert_eq!(
        Address::from_str(transaction["from"].as_str().unwrap()).unwrap(),
        DEPLOYER
    );
    assert_eq!(transaction["data"], json!(payload));
    assert_eq!(transaction["gas"], json!("0x124f80"));
    // The node picks the gas price unless the profile fixes one.
    assert!(transaction.get("gasPrice").is_none());
}

#[tokio::test]
async fn test_unlocked_identity_with_fixed_gas_price() {
    let node = StubNode::start(|method, _| match method {
        "eth_sendTransaction" => Ok(json!(TX_HASH)),
        other => unknown(other),
    })
    .await;

    let identity = UnlockedIdentity::new(DEPLOYER, node.ledger())
        .with_gas_price(GasPricePolicy::Fixed(20_000_000_000));
    identity
        .authorize_and_submit(&Bytes::from_static(&[0x60, 0x80]), 60_000)
        .await
        .unwrap();

    let transaction = &node.params("eth_sendTransaction")[0];
    assert_eq!(transaction["gasPrice"], json!("0x4a817c800"));
}

#[tokio::test]
async fn test_first_account_requires_a_managed_account() {
    let node = StubNode::start(|method, _| match method {
        "eth_accounts" => Ok(json!([])),
        other => unknown(other),
    })
    .await;

    let error = UnlockedIdentity::first_account(node.ledger()).await.unwrap_err();
    assert!(error.to_string().contains("manages no accounts"));
}
