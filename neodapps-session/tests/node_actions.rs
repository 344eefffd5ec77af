//! Token balances, invoke file steps and block listing against a fake
//! neo-express node served by axum.

use axum::{extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use neodapps_chain::{Chain, InvokeFileItem};
use neodapps_crypto::{script_hash_to_hex, tx, KeyPair, ScryptParams};
use neodapps_express::ShellTerminal;
use neodapps_rpc::HttpNodeRpc;
use neodapps_session::{BlockSubscription, Session, SessionError, Settings, WalletService};
use serde_json::{json, Value};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

const KEY: &str = "1dd37fba80fec4e6a6f13fd708d8dcb3b29def768017052f6c930fa1c5d90bbb";
const MAGIC: u32 = 12345;
const INCREMENT: u32 = 100;
const SCRIPT: &str = "EMAfDARuYW1lDBQ=";
const TOKEN_V1: &str = "0x1111111111111111111111111111111111111111";
const TOKEN_V2: &str = "0x2222222222222222222222222222222222222222";
const LIGHT: ScryptParams = ScryptParams { n: 2, r: 1, p: 1 };

#[derive(Default)]
struct FakeNode {
    height: AtomicU32,
    invoked: Mutex<Vec<Value>>,
    priced: Mutex<Option<String>>,
    sent: Mutex<Option<String>>,
}

fn token(hash: &str) -> Value {
    json!({
        "id": 1,
        "hash": hash,
        "manifest": { "name": "Token", "abi": { "methods": [
            { "name": "transfer", "safe": false, "returntype": "Boolean", "parameters": [
                { "name": "from", "type": "Hash160" },
                { "name": "to", "type": "Hash160" },
                { "name": "amount", "type": "Integer" },
                { "name": "data", "type": "Any" }
            ]},
            { "name": "explode", "safe": false, "returntype": "Void", "parameters": [] }
        ]}}
    })
}

async fn handle(State(node): State<Arc<FakeNode>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let params = request["params"].clone();
    let result = match request["method"].as_str() {
        Some("getblockcount") => json!(node.height.load(Ordering::SeqCst)),
        Some("getversion") => json!({
            "tcpport": 50011,
            "protocol": {
                "network": MAGIC,
                "addressversion": 53,
                "maxvaliduntilblockincrement": INCREMENT
            }
        }),
        Some("getblock") => {
            let index = params[0].as_u64().unwrap_or(0);
            json!({
                "hash": format!("0x{index:064x}"),
                "size": 697,
                "index": index,
                "time": 1_700_000_000_000u64 + index * 15_000,
                "tx": []
            })
        }
        Some("getnep17balances") => json!({
            "address": params[0],
            "balance": [
                { "assethash": "0xd2a4cff31913016155e38e474a2c06d08be276cf", "amount": "5000000000",
                  "lastupdatedblock": 2, "symbol": "GAS", "decimals": "8" }
            ]
        }),
        Some("getnativecontracts") => json!([{
            "id": -6,
            "hash": "0xd2a4cff31913016155e38e474a2c06d08be276cf",
            "manifest": { "name": "GasToken", "abi": { "methods": [
                { "name": "balanceOf", "safe": true, "returntype": "Integer",
                  "parameters": [{ "name": "account", "type": "Hash160" }] }
            ]}}
        }]),
        Some("expresslistcontracts") => json!([token(TOKEN_V1), token(TOKEN_V2)]),
        Some("invokefunction") => {
            node.invoked.lock().unwrap().push(params.clone());
            if params[1] == "explode" {
                json!({ "script": SCRIPT, "state": "FAULT", "gasconsumed": "0", "exception": "boom", "stack": [] })
            } else {
                json!({ "script": SCRIPT, "state": "HALT", "gasconsumed": "1007270", "stack": [] })
            }
        }
        Some("calculatenetworkfee") => {
            *node.priced.lock().unwrap() = params[0].as_str().map(str::to_string);
            json!({ "networkfee": "122520" })
        }
        Some("sendrawtransaction") => {
            *node.sent.lock().unwrap() = params[0].as_str().map(str::to_string);
            json!({ "hash": "0xfeed" })
        }
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "Method not found" }
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn spawn_node(height: u32) -> (Arc<FakeNode>, u16) {
    let node = Arc::new(FakeNode::default());
    node.height.store(height, Ordering::SeqCst);
    let app = Router::new().route("/", post(handle)).with_state(node.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (node, port)
}

fn write_config(root: &Path, rpc_port: u16) {
    let body = json!({
        "magic": MAGIC,
        "address-version": 53,
        "consensus-nodes": [{ "tcp-port": 50011, "ws-port": 50014, "rpc-port": rpc_port }],
        "wallets": [
            { "name": "alice", "accounts": [
                { "private-key": KEY, "script-hash": "ignored", "label": "main", "is-default": true }
            ]},
            { "name": "empty", "accounts": [] }
        ]
    });
    std::fs::write(root.join("dev.neo-express"), body.to_string()).unwrap();
}

/// A session on a one node private chain served by a fresh fake node.
async fn open(root: &Path, height: u32) -> (Session, Arc<Chain>, Arc<FakeNode>) {
    let (node, port) = spawn_node(height).await;
    write_config(root, port);

    let timeout = Duration::from_secs(2);
    let rpc = Arc::new(HttpNodeRpc::new(timeout).unwrap());
    let session = Session::with_parts(root, Settings::default(), rpc.clone(), Arc::new(ShellTerminal))
        .with_wallet_service(WalletService::with_scrypt(rpc, LIGHT).with_rpc_timeout(timeout));
    session.chains().load_chains();
    let chain = session.chains().find("dev").unwrap();
    (session, chain, node)
}

fn key() -> KeyPair {
    KeyPair::from_hex(KEY).unwrap()
}

fn transfer(to: &str) -> InvokeFileItem {
    InvokeFileItem::new(
        "Token",
        "transfer",
        vec![json!(key().address(53)), json!(to), json!("100"), json!(null)],
    )
}

#[tokio::test]
async fn balances_cover_every_wallet_account() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, _node) = open(dir.path(), 3).await;

    let balances = session.wallets().get_token_balances(&chain).await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(balances[0].wallet, "alice");
    assert_eq!(balances[0].accounts.len(), 1);
    assert_eq!(balances[0].accounts[0].address, key().address(53));
    assert_eq!(balances[0].accounts[0].balance[0].symbol.as_deref(), Some("GAS"));
    assert_eq!(balances[1].wallet, "empty");
    assert!(balances[1].accounts.is_empty());
}

#[tokio::test]
async fn test_invoke_converts_arguments_and_picks_the_latest_deployment() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, node) = open(dir.path(), 3).await;
    let to = "0xABCDEF0123456789abcdef0123456789ABCDEF01";

    let address = key().address(53);
    let result = session
        .test_invoke_item(&chain, &transfer(to), Some(&address))
        .await
        .unwrap();
    assert!(result.halted());
    assert_eq!(result.gasconsumed, "1007270");

    let from = script_hash_to_hex(&key().script_hash());
    let invoked = node.invoked.lock().unwrap()[0].clone();
    assert_eq!(
        invoked,
        json!([
            TOKEN_V2,
            "transfer",
            [
                { "type": "Hash160", "value": from },
                { "type": "Hash160", "value": to.to_ascii_lowercase() },
                { "type": "Integer", "value": "100" },
                { "type": "Any" }
            ],
            [{ "account": from, "scopes": "CalledByEntry" }]
        ])
    );

    // Without an account nothing signs; native contracts resolve by name.
    let balance = InvokeFileItem::new("GasToken", "balanceOf", vec![json!(address)]);
    session.test_invoke_item(&chain, &balance, None).await.unwrap();
    let invoked = node.invoked.lock().unwrap()[1].clone();
    assert_eq!(invoked[0], "0xd2a4cff31913016155e38e474a2c06d08be276cf");
    assert_eq!(invoked[3], json!([]));
}

#[tokio::test]
async fn unresolvable_steps_never_reach_the_node() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, node) = open(dir.path(), 3).await;

    let missing = InvokeFileItem::new("Nope", "transfer", vec![]);
    assert!(matches!(
        session.test_invoke_item(&chain, &missing, None).await,
        Err(SessionError::UnknownContract(name)) if name == "Nope"
    ));

    let unknown = InvokeFileItem::new("Token", "mint", vec![]);
    assert!(matches!(
        session.test_invoke_item(&chain, &unknown, None).await,
        Err(SessionError::UnknownOperation { operation, .. }) if operation == "mint"
    ));

    let short = InvokeFileItem::new("Token", "transfer", vec![json!(key().address(53))]);
    assert!(matches!(
        session.test_invoke_item(&chain, &short, None).await,
        Err(SessionError::InvalidArgument { parameter, .. }) if parameter == "to"
    ));

    let bad = InvokeFileItem::new("Token", "transfer", vec![json!(1), json!(2), json!(3), json!(4)]);
    assert!(matches!(
        session.test_invoke_item(&chain, &bad, None).await,
        Err(SessionError::InvalidArgument { parameter, .. }) if parameter == "from"
    ));

    assert!(node.invoked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invoke_signs_and_sends_the_tested_script() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, node) = open(dir.path(), 3).await;
    let key = key();

    let item = transfer("0x0000000000000000000000000000000000000001");
    let hash = session
        .invoke_item(&chain, &item, &key.address(53))
        .await
        .unwrap();
    assert_eq!(hash, "0xfeed");

    let script = STANDARD.decode(SCRIPT).unwrap();
    let sent = STANDARD.decode(node.sent.lock().unwrap().clone().unwrap()).unwrap();
    let (unsigned, witnesses) = sent.split_at(sent.len() - 109);

    assert_eq!(unsigned[0], 0);
    assert_eq!(&unsigned[5..13], &1007270i64.to_le_bytes());
    assert_eq!(&unsigned[13..21], &122520i64.to_le_bytes());
    assert_eq!(&unsigned[21..25], &(3 + INCREMENT - 1).to_le_bytes());
    assert_eq!(unsigned[25], 1);
    assert_eq!(&unsigned[26..46], &key.script_hash());
    assert_eq!(unsigned[46], 0x01);
    assert_eq!(unsigned[47], 0);
    assert_eq!(unsigned[48] as usize, script.len());
    assert_eq!(&unsigned[49..], &script[..]);

    assert_eq!(&witnesses[..4], &[1, 66, 0x0c, 0x40]);
    assert_eq!(witnesses[68], 40);
    assert_eq!(&witnesses[69..], &key.verification_script()[..]);
    assert!(key.verify(&tx::sign_data(MAGIC, unsigned), &witnesses[4..68]));

    // Fees were priced on the same transaction with an unsigned witness.
    let priced = STANDARD.decode(node.priced.lock().unwrap().clone().unwrap()).unwrap();
    let (priced_unsigned, priced_witness) = priced.split_at(priced.len() - 43);
    assert_eq!(&priced_unsigned[..13], &unsigned[..13]);
    assert_eq!(&priced_unsigned[21..], &unsigned[21..]);
    assert_eq!(&priced_witness[..3], &[1, 0, 40]);
}

#[tokio::test]
async fn faulted_test_run_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, node) = open(dir.path(), 3).await;

    let item = InvokeFileItem::new("Token", "explode", vec![]);
    let err = session
        .invoke_item(&chain, &item, &key().address(53))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvocationFault { state, exception } if state == "FAULT" && exception.as_deref() == Some("boom")
    ));
    assert!(node.sent.lock().unwrap().is_none());

    let stranger = KeyPair::from_hex(&"11".repeat(32)).unwrap().address(53);
    assert!(matches!(
        session.invoke_item(&chain, &item, &stranger).await,
        Err(SessionError::UnknownAccount(_))
    ));
}

#[tokio::test]
async fn recent_blocks_end_at_the_tip() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, _node) = open(dir.path(), 3).await;

    let all: Vec<u32> = session
        .blocks()
        .recent_blocks(&chain, 10)
        .await
        .unwrap()
        .iter()
        .map(|b| b.index)
        .collect();
    assert_eq!(all, vec![0, 1, 2]);

    let last = session.blocks().recent_blocks(&chain, 1).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].index, 2);
    assert_eq!(last[0].hash, format!("0x{:064x}", 2));
}

#[tokio::test]
async fn subscription_catches_up_then_follows() {
    let dir = tempfile::tempdir().unwrap();
    let (session, chain, node) = open(dir.path(), 3).await;

    let mut blocks = session
        .blocks()
        .subscribe(&chain, 2, Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(next_index(&mut blocks).await, 1);
    assert_eq!(next_index(&mut blocks).await, 2);

    node.height.store(5, Ordering::SeqCst);
    assert_eq!(next_index(&mut blocks).await, 3);
    assert_eq!(next_index(&mut blocks).await, 4);
}

async fn next_index(blocks: &mut BlockSubscription) -> u32 {
    tokio::time::timeout(Duration::from_secs(5), blocks.recv())
        .await
        .unwrap()
        .unwrap()
        .index
}
