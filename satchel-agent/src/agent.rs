use rst_common::with_logging::log::info;

use satchel_core::identity::connection::types::ConnectionAlias;
use satchel_core::identity::connection::Usecase as ConnectionCore;
use satchel_core::identity::credential::Usecase as CredentialCore;
use satchel_core::identity::proof::Usecase as ProofCore;
use satchel_core::messaging::types::RouterBuilder;
use satchel_core::runtime::types::{CryptoRuntimeBuilder, LedgerBuilder};

use crate::common::types::{CommonError, ToValidate};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::storage::connection::Repository as ConnectionRepository;
use crate::storage::credential::Repository as CredentialRepository;
use crate::storage::proof::Repository as ProofRepository;
use crate::storage::{Builder as DbBuilder, Store};
use crate::tails::TailsCache;

pub type ConnectionUsecase<TCrypto, TRouter> =
    ConnectionCore<ConnectionRepository, TCrypto, TRouter>;

pub type CredentialUsecase<TCrypto, TLedger, TRouter> = CredentialCore<
    CredentialRepository,
    ConnectionUsecase<TCrypto, TRouter>,
    TCrypto,
    TLedger,
    TailsCache<TLedger>,
    TRouter,
>;

pub type ProofUsecase<TCrypto, TLedger, TRouter> = ProofCore<
    ProofRepository,
    ConnectionUsecase<TCrypto, TRouter>,
    TCrypto,
    TLedger,
    TailsCache<TLedger>,
    TRouter,
>;

pub type AgentDispatcher<TCrypto, TLedger, TRouter> = Dispatcher<
    ConnectionUsecase<TCrypto, TRouter>,
    CredentialUsecase<TCrypto, TLedger, TRouter>,
    ProofUsecase<TCrypto, TLedger, TRouter>,
    TCrypto,
>;

/// `Agent` wires the three state machines over a single record store, a
/// filesystem tails cache and the given collaborators
///
/// The crypto runtime, the ledger client and the router are supplied by the
/// embedding process, use [`crate::router::HttpRouter`] to deliver over HTTP
#[derive(Clone)]
pub struct Agent<TCrypto, TLedger, TRouter>
where
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TRouter: RouterBuilder,
{
    endpoint: String,
    master_secret_id: String,
    connection: ConnectionUsecase<TCrypto, TRouter>,
    credential: CredentialUsecase<TCrypto, TLedger, TRouter>,
    proof: ProofUsecase<TCrypto, TLedger, TRouter>,
    dispatcher: AgentDispatcher<TCrypto, TLedger, TRouter>,
    tails: TailsCache<TLedger>,
}

impl<TCrypto, TLedger, TRouter> Agent<TCrypto, TLedger, TRouter>
where
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TRouter: RouterBuilder,
{
    pub fn from_config(
        config: &Config,
        crypto: TCrypto,
        ledger: TLedger,
        router: TRouter,
    ) -> Result<Self, CommonError> {
        config.validate()?;

        let executor = DbBuilder::new(config.to_owned()).build(|opts| {
            let wallet = opts.db().wallet.clone();
            (wallet.get_common(), wallet.get_db_options())
        })?;
        let store = Store::new(executor);
        let tails = TailsCache::from_config(config, ledger.clone())?;

        let endpoint = config.agent().get_endpoint();
        let master_secret_id = config.agent().get_master_secret_id();
        let (label, image_url) = config.agent().get_owner();
        let owner = label.map(|name| ConnectionAlias::new(name, image_url));

        let connection = ConnectionCore::new(
            ConnectionRepository::new(store.clone()),
            crypto.clone(),
            router.clone(),
            endpoint.clone(),
            owner,
        );

        let credential = CredentialCore::new(
            CredentialRepository::new(store.clone()),
            connection.clone(),
            crypto.clone(),
            ledger.clone(),
            tails.clone(),
            router.clone(),
        );

        let proof = ProofCore::new(
            ProofRepository::new(store),
            connection.clone(),
            crypto.clone(),
            ledger,
            tails.clone(),
            router,
            master_secret_id.clone(),
        );

        let dispatcher = Dispatcher::new(
            connection.clone(),
            credential.clone(),
            proof.clone(),
            crypto,
        );

        info!(
            "[agent:from_config] agent assembled, inbox: {}, tails: {}",
            endpoint,
            tails.dir().display()
        );

        Ok(Self {
            endpoint,
            master_secret_id,
            connection,
            credential,
            proof,
            dispatcher,
            tails,
        })
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.to_owned()
    }

    /// `master_secret_id` is the holder's wallet master secret, it must be given to
    /// every credential request
    pub fn master_secret_id(&self) -> String {
        self.master_secret_id.to_owned()
    }

    pub fn connection(&self) -> &ConnectionUsecase<TCrypto, TRouter> {
        &self.connection
    }

    pub fn credential(&self) -> &CredentialUsecase<TCrypto, TLedger, TRouter> {
        &self.credential
    }

    pub fn proof(&self) -> &ProofUsecase<TCrypto, TLedger, TRouter> {
        &self.proof
    }

    pub fn dispatcher(&self) -> &AgentDispatcher<TCrypto, TLedger, TRouter> {
        &self.dispatcher
    }

    pub fn tails(&self) -> &TailsCache<TLedger> {
        &self.tails
    }
}
